//! Curve Tag Types
//!
//! ICC profiles use curves for tone reproduction (TRC).
//! Two main types:
//! - curv: Simple gamma or lookup table
//! - para: Parametric curves with formula
//!
//! See ICC.1:2022 Sections 10.6 (curv) and 10.18 (para)

use crate::context::Context;
use crate::curve::{CurveKind, DEFAULT_TABLE_SIZE, ToneCurve};
use crate::error::{Error, Result};
use crate::icc::error::IccError;
use crate::icc::header::ProfileVersion;
use crate::icc::types::{Reader, TypeSignature, U8Fixed8, WriteBe};
use crate::math::gamma::{ParametricCurve, ParametricCurveType};

use super::text::type_header;

/// Parse a 'curv' or 'para' tag starting at `offset`
///
/// Returns the curve and the number of bytes it occupies, which the
/// embedding lut types need to find the next curve.
pub fn parse_curve_at(
    data: &[u8],
    offset: usize,
    ctx: Option<&Context>,
) -> Result<(ToneCurve, usize)> {
    let mut r = Reader::at(data, offset, "curve")?;
    let sig = TypeSignature(r.u32()?);
    r.skip(4)?;

    let curve = match sig {
        TypeSignature::CURVE => {
            let count = r.u32()? as usize;
            match count {
                0 => ToneCurve::identity(),
                1 => {
                    let gamma = U8Fixed8(r.u16()?).to_f64();
                    if gamma <= 0.0 {
                        return Err(Error::corrupt("curv gamma of zero"));
                    }
                    ToneCurve::gamma(gamma, ctx)?
                }
                _ => {
                    let raw = r.bytes(count.checked_mul(2).ok_or_else(|| {
                        Error::corrupt(format!("curv count {} overflows", count))
                    })?)?;
                    let table: Vec<u16> = raw
                        .chunks_exact(2)
                        .map(|c| u16::from_be_bytes([c[0], c[1]]))
                        .collect();
                    ToneCurve::from_table_u16(&table, ctx)?
                }
            }
        }
        TypeSignature::PARA => {
            let function_type = r.u16()?;
            r.skip(2)?;
            let family = ParametricCurveType::from_icc(function_type).ok_or_else(|| {
                Error::corrupt(format!("unknown parametric function type {}", function_type))
            })?;
            let params = (0..family.param_count())
                .map(|_| r.s15f16())
                .collect::<std::result::Result<Vec<_>, IccError>>()?;
            let curve = ParametricCurve::from_params(family, &params).ok_or_else(|| {
                Error::corrupt("parametric curve parameter count")
            })?;
            ToneCurve::from_parametric(curve, ctx)
        }
        other => {
            return Err(Error::corrupt(format!(
                "expected curv or para, found '{}'",
                other
            )));
        }
    };
    Ok((curve, r.position() - offset))
}

/// Parse a whole 'curv' or 'para' tag
pub fn parse_curve(data: &[u8], ctx: Option<&Context>) -> Result<ToneCurve> {
    parse_curve_at(data, 0, ctx).map(|(curve, _)| curve)
}

/// Serialize a curve in the form `version` expects
///
/// v4 profiles store built-in parametric curves as 'para'. Everything
/// else becomes 'curv': a single gamma when possible, a 16-bit table
/// otherwise.
pub fn write_curve(curve: &ToneCurve, version: ProfileVersion) -> Vec<u8> {
    if let CurveKind::Parametric(p) = curve.kind() {
        if !p.inverted {
            if version.is_v4() {
                return write_para(p);
            }
            if p.curve_type == ParametricCurveType::Gamma && p.g > 0.0 && p.g < 255.0 {
                let mut out = type_header(TypeSignature::CURVE);
                out.put_u32(1);
                out.put_u16(U8Fixed8::from_f64(p.g).0);
                return out;
            }
        }
    }

    let table = curve
        .uniform_table()
        .unwrap_or_else(|| tabulate_unit(curve, DEFAULT_TABLE_SIZE));
    let mut out = type_header(TypeSignature::CURVE);
    out.put_u32(table.len() as u32);
    for v in table {
        out.put_u16(quantize_u16(v));
    }
    out
}

fn write_para(p: &ParametricCurve) -> Vec<u8> {
    let mut out = type_header(TypeSignature::PARA);
    out.put_u16(p.curve_type.to_icc());
    out.put_u16(0);
    for v in p.params() {
        out.put_s15f16(v);
    }
    out
}

/// Sample a curve at `points` uniform inputs over [0, 1]
pub(crate) fn tabulate_unit(curve: &ToneCurve, points: usize) -> Vec<f64> {
    let step = (points.max(2) - 1) as f64;
    (0..points.max(2))
        .map(|i| curve.evaluate(i as f64 / step))
        .collect()
}

#[inline]
pub(crate) fn quantize_u16(v: f64) -> u16 {
    if v.is_nan() {
        0
    } else {
        (v.clamp(0.0, 1.0) * 65535.0).round() as u16
    }
}
