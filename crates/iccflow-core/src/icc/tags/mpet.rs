//! Multi Process Element Tag Type
//!
//! 'mpet' stores a pipeline as a list of float elements:
//! - cvst: one segmented curve ('curf') per channel
//! - matf: matrix plus offset
//! - clut: float grid
//!
//! This is the generic form every [`Pipeline`] is written in. Offsets in
//! the position tables are relative to the start of the tag (for the
//! element list) or of the element (for curves inside a 'cvst').
//!
//! See ICC.1:2022 Section 10.16

use crate::context::Context;
use crate::curve::{CurveKind, ToneCurve};
use crate::error::{Error, Result};
use crate::icc::types::{Reader, TypeSignature, WriteBe};
use crate::pipeline::{ClutStage, MAX_CHANNELS, MatrixStage, Pipeline, Stage};

use super::curves::tabulate_unit;
use super::malformed;
use super::text::type_header;

/// Samples written for curves that are not already tables
const SEGMENT_SAMPLES: usize = 1024;

/// Points taken across a formula segment when it is read
const FORMULA_PROBES: usize = 1024;

/// Parse 'mpet'
pub fn parse_mpet(data: &[u8], ctx: Option<&Context>) -> Result<Pipeline> {
    let mut r = Reader::at(data, 8, "mpet")?;
    let inputs = r.u16()? as usize;
    let outputs = r.u16()? as usize;
    let count = r.u32()? as usize;
    if count == 0 {
        return Err(Error::corrupt("mpet without elements"));
    }

    let mut pipeline = Pipeline::allocate(inputs, outputs, ctx).map_err(malformed("mpet"))?;
    for _ in 0..count {
        let offset = r.u32()? as usize;
        let size = r.u32()? as usize;
        let end = offset
            .checked_add(size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::corrupt("mpet element out of bounds"))?;
        let stage = parse_element(&data[offset..end], ctx)?;
        pipeline
            .append_stage(stage)
            .map_err(|e| Error::corrupt(format!("mpet elements do not chain: {}", e)))?;
    }
    if pipeline.output_channels() != outputs {
        return Err(Error::corrupt(format!(
            "mpet elements produce {} channels, header says {}",
            pipeline.output_channels(),
            outputs
        )));
    }
    Ok(pipeline)
}

fn element_channels(r: &mut Reader<'_>) -> Result<(usize, usize)> {
    let inputs = r.u16()? as usize;
    let outputs = r.u16()? as usize;
    for n in [inputs, outputs] {
        if n == 0 || n > MAX_CHANNELS {
            return Err(Error::corrupt(format!("mpet element with {} channels", n)));
        }
    }
    Ok((inputs, outputs))
}

fn parse_element(data: &[u8], ctx: Option<&Context>) -> Result<Stage> {
    let mut r = Reader::new(data, "mpet element");
    let sig = TypeSignature(r.u32()?);
    r.skip(4)?;
    let (inputs, outputs) = element_channels(&mut r)?;

    match sig {
        TypeSignature::CURVE_SET_ELEM => {
            if inputs != outputs {
                return Err(Error::corrupt("cvst with differing channel counts"));
            }
            let mut curves = Vec::with_capacity(inputs);
            for _ in 0..inputs {
                let offset = r.u32()? as usize;
                let size = r.u32()? as usize;
                let end = offset
                    .checked_add(size)
                    .filter(|&end| end <= data.len())
                    .ok_or_else(|| Error::corrupt("cvst curve out of bounds"))?;
                curves.push(parse_segmented_curve(&data[offset..end], ctx)?);
            }
            Stage::curves(curves).map_err(malformed("cvst"))
        }
        TypeSignature::MATRIX_ELEM => {
            let values = (0..inputs * outputs + outputs)
                .map(|_| r.f32().map(f64::from))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let (coeffs, offset) = values.split_at(inputs * outputs);
            MatrixStage::new(outputs, inputs, coeffs, Some(offset))
                .map(Stage::Matrix)
                .map_err(malformed("matf"))
        }
        TypeSignature::CLUT_ELEM => {
            let dims = r.bytes(16)?;
            let grid: Vec<usize> = dims[..inputs].iter().map(|&p| p as usize).collect();
            let nodes = grid
                .iter()
                .try_fold(outputs, |acc, &p| acc.checked_mul(p))
                .ok_or_else(|| Error::corrupt("clut element too large"))?;
            let table = (0..nodes)
                .map(|_| r.f32().map(f64::from))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ClutStage::new(&grid, outputs, table)
                .map(Stage::Clut)
                .map_err(malformed("clut"))
        }
        other => Err(Error::corrupt(format!("unsupported mpet element '{}'", other))),
    }
}

/// One piece of a segmented curve
enum Segment {
    /// Formula type and its parameters
    Formula(u16, Vec<f64>),
    /// Samples over the segment; the value at its lower bound is implied
    Sampled(Vec<f64>),
}

fn formula(kind: u16, p: &[f64], x: f64) -> f64 {
    match kind {
        0 => {
            let base = p[1] * x + p[2];
            let powered = if p[0] == 1.0 { base } else { base.max(0.0).powf(p[0]) };
            powered + p[3]
        }
        1 => p[1] * (p[2] * x.max(0.0).powf(p[0]) + p[3]).max(f64::MIN_POSITIVE).log10() + p[4],
        _ => p[0] * p[1].powf(p[2] * x + p[3]) + p[4],
    }
}

/// Read a 'curf' and resample it over [0, 1]
fn parse_segmented_curve(data: &[u8], ctx: Option<&Context>) -> Result<ToneCurve> {
    let mut r = Reader::new(data, "curf");
    if TypeSignature(r.u32()?) != TypeSignature::SEGMENTED_CURVE {
        return Err(Error::corrupt("cvst entry is not a curf"));
    }
    r.skip(4)?;
    let count = r.u16()? as usize;
    r.skip(2)?;
    if count == 0 {
        return Err(Error::corrupt("curf without segments"));
    }
    let mut bounds = vec![f64::NEG_INFINITY];
    for _ in 1..count {
        bounds.push(r.f32()? as f64);
    }
    bounds.push(f64::INFINITY);
    if bounds.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::corrupt("curf breakpoints out of order"));
    }

    let mut segments = Vec::with_capacity(count);
    for _ in 0..count {
        let sig = TypeSignature(r.u32()?);
        r.skip(4)?;
        let segment = match sig {
            TypeSignature::FORMULA_SEGMENT => {
                let kind = r.u16()?;
                r.skip(2)?;
                let n = match kind {
                    0 => 4,
                    1 | 2 => 5,
                    other => {
                        return Err(Error::corrupt(format!("parf function type {}", other)));
                    }
                };
                let params = (0..n)
                    .map(|_| r.f32().map(f64::from))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Segment::Formula(kind, params)
            }
            TypeSignature::SAMPLED_SEGMENT => {
                let n = r.u32()? as usize;
                let samples = (0..n)
                    .map(|_| r.f32().map(f64::from))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                if samples.is_empty() {
                    return Err(Error::corrupt("samf without samples"));
                }
                Segment::Sampled(samples)
            }
            other => return Err(Error::corrupt(format!("unknown curve segment '{}'", other))),
        };
        segments.push(segment);
    }

    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut previous_end = 0.0;
    for (i, segment) in segments.iter().enumerate() {
        let (lo, hi) = (bounds[i], bounds[i + 1]);
        match segment {
            Segment::Formula(kind, params) => {
                let (a, b) = (lo.max(0.0), hi.min(1.0));
                if a <= b {
                    let steps = if a < b { FORMULA_PROBES } else { 1 };
                    for k in 0..steps {
                        let x = if steps == 1 { a } else { a + (b - a) * k as f64 / (steps - 1) as f64 };
                        points.push((x, formula(*kind, params, x)));
                    }
                }
                previous_end = formula(*kind, params, hi.min(1.0).max(lo));
            }
            Segment::Sampled(samples) => {
                if !lo.is_finite() || !hi.is_finite() {
                    return Err(Error::corrupt("samf on an unbounded segment"));
                }
                let n = samples.len() as f64;
                points.push((lo, previous_end));
                for (k, &y) in samples.iter().enumerate() {
                    points.push((lo + (hi - lo) * (k + 1) as f64 / n, y));
                }
                previous_end = samples[samples.len() - 1];
            }
        }
    }

    points.retain(|(x, _)| (0.0..=1.0).contains(x));
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points.dedup_by(|later, earlier| later.0 <= earlier.0);
    ToneCurve::from_points(points, ctx)
}

/// Serialize a pipeline as 'mpet'
///
/// PCS conversion stages have no element form and are rejected.
pub fn write_mpet(pipeline: &Pipeline) -> Result<Vec<u8>> {
    let elements = pipeline
        .stages()
        .iter()
        .map(write_element)
        .collect::<Result<Vec<_>>>()?;
    let elements = if elements.is_empty() {
        vec![write_curve_set(&vec![ToneCurve::identity(); pipeline.input_channels()])]
    } else {
        elements
    };

    let mut out = type_header(TypeSignature::MPET);
    out.put_u16(pipeline.input_channels() as u16);
    out.put_u16(pipeline.output_channels() as u16);
    out.put_u32(elements.len() as u32);

    let mut offset = out.len() + elements.len() * 8;
    for element in &elements {
        out.put_u32(offset as u32);
        out.put_u32(element.len() as u32);
        offset += element.len();
    }
    for element in elements {
        out.extend_from_slice(&element);
    }
    Ok(out)
}

fn element_header(sig: TypeSignature, inputs: usize, outputs: usize) -> Vec<u8> {
    let mut out = type_header(sig);
    out.put_u16(inputs as u16);
    out.put_u16(outputs as u16);
    out
}

fn write_element(stage: &Stage) -> Result<Vec<u8>> {
    match stage {
        Stage::Curves(curves) => Ok(write_curve_set(curves)),
        Stage::Identity(n) => Ok(write_curve_set(&vec![ToneCurve::identity(); *n])),
        Stage::Clamp(n) => {
            let curves = (0..*n).map(|_| write_clamp_curve()).collect();
            Ok(write_curve_set_raw(curves))
        }
        Stage::Matrix(m) => {
            let mut out = element_header(TypeSignature::MATRIX_ELEM, m.cols(), m.rows());
            for &v in m.coeffs().iter().chain(m.offset()) {
                out.put_f32(v as f32);
            }
            Ok(out)
        }
        Stage::Clut(c) => {
            let mut out = element_header(TypeSignature::CLUT_ELEM, c.inputs(), c.outputs());
            let mut dims = [0u8; 16];
            for (d, &p) in dims.iter_mut().zip(c.grid()) {
                *d = p as u8;
            }
            out.extend_from_slice(&dims);
            for &v in c.table() {
                out.put_f32(v as f32);
            }
            Ok(out)
        }
        Stage::LabToXyz | Stage::XyzToLab => Err(Error::invalid(format!(
            "{} stage cannot be stored in a profile",
            stage.name()
        ))),
    }
}

fn write_curve_set(curves: &[ToneCurve]) -> Vec<u8> {
    write_curve_set_raw(curves.iter().map(write_segmented_curve).collect())
}

fn write_curve_set_raw(curves: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = element_header(TypeSignature::CURVE_SET_ELEM, curves.len(), curves.len());
    let mut offset = out.len() + curves.len() * 8;
    for curve in &curves {
        out.put_u32(offset as u32);
        out.put_u32(curve.len() as u32);
        offset += curve.len();
    }
    for curve in curves {
        out.extend_from_slice(&curve);
    }
    out
}

fn put_formula(out: &mut Vec<u8>, params: [f32; 4]) {
    out.put_sig(TypeSignature::FORMULA_SEGMENT);
    out.put_u32(0);
    out.put_u16(0);
    out.put_u16(0);
    for p in params {
        out.put_f32(p);
    }
}

fn constant(value: f32) -> [f32; 4] {
    [1.0, 0.0, 0.0, value]
}

const IDENTITY_FORMULA: [f32; 4] = [1.0, 1.0, 0.0, 0.0];

fn curf_header(segments: u16) -> Vec<u8> {
    let mut out = type_header(TypeSignature::SEGMENTED_CURVE);
    out.put_u16(segments);
    out.put_u16(0);
    out
}

/// 0 below the range, identity inside it, 1 above it
fn write_clamp_curve() -> Vec<u8> {
    let mut out = curf_header(3);
    out.put_f32(0.0);
    out.put_f32(1.0);
    put_formula(&mut out, constant(0.0));
    put_formula(&mut out, IDENTITY_FORMULA);
    put_formula(&mut out, constant(1.0));
    out
}

/// Exact identities become one formula; every other curve is a
/// constant, a sampled stretch over (0, 1], and another constant.
fn write_segmented_curve(curve: &ToneCurve) -> Vec<u8> {
    if curve.is_identity() {
        let mut out = curf_header(1);
        put_formula(&mut out, IDENTITY_FORMULA);
        return out;
    }

    let table = match curve.kind() {
        CurveKind::Sampled(_) => curve
            .uniform_table()
            .unwrap_or_else(|| tabulate_unit(curve, SEGMENT_SAMPLES)),
        _ => tabulate_unit(curve, SEGMENT_SAMPLES),
    };
    let first = table[0] as f32;
    let last = table[table.len() - 1] as f32;

    let mut out = curf_header(3);
    out.put_f32(0.0);
    out.put_f32(1.0);
    put_formula(&mut out, constant(first));
    out.put_sig(TypeSignature::SAMPLED_SEGMENT);
    out.put_u32(0);
    out.put_u32(table.len() as u32 - 1);
    for &v in &table[1..] {
        out.put_f32(v as f32);
    }
    put_formula(&mut out, constant(last));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Matrix3x3;

    fn assert_same_output(a: &Pipeline, b: &Pipeline, eps: f64) {
        for input in [[0.0, 0.0, 0.0], [0.2, 0.4, 0.6], [1.0, 0.5, 0.25], [1.0, 1.0, 1.0]] {
            let x = a.evaluate(&input).unwrap();
            let y = b.evaluate(&input).unwrap();
            for (u, v) in x.iter().zip(&y) {
                assert!((u - v).abs() < eps, "{:?} vs {:?} at {:?}", x, y, input);
            }
        }
    }

    #[test]
    fn test_curves_matrix_clut_roundtrip() {
        let m = Matrix3x3::new([[0.4361, 0.3851, 0.1431], [0.2225, 0.7169, 0.0606], [0.0139, 0.0971, 0.7141]]);
        let original = Pipeline::from_stages(
            vec![
                Stage::Curves(vec![ToneCurve::gamma(2.2, None).unwrap(); 3]),
                Stage::Matrix(MatrixStage::from_matrix3(&m, Some([0.01, 0.0, -0.01]))),
                Stage::Clut(ClutStage::from_fn(&[3, 3, 3], 3, |i, o| {
                    o[0] = i[0] * 0.5;
                    o[1] = i[1];
                    o[2] = 1.0 - i[2];
                }).unwrap()),
            ],
            None,
        )
        .unwrap();

        let bytes = write_mpet(&original).unwrap();
        let back = parse_mpet(&bytes, None).unwrap();
        assert_eq!(back.stage_count(), 3);
        assert_same_output(&original, &back, 1e-3);

        // Writing the decoded pipeline again is stable
        assert_eq!(write_mpet(&back).unwrap(), bytes);
    }

    #[test]
    fn test_identity_curve_is_one_formula() {
        let p = Pipeline::from_stages(vec![Stage::identity_curves(3).unwrap()], None).unwrap();
        let bytes = write_mpet(&p).unwrap();
        let back = parse_mpet(&bytes, None).unwrap();
        let Stage::Curves(curves) = &back.stages()[0] else {
            panic!("expected curves");
        };
        assert!(curves.iter().all(ToneCurve::is_identity));
    }

    #[test]
    fn test_near_identity_curve_keeps_its_samples() {
        let near = ToneCurve::from_table(&[0.0, 0.5001, 1.0], None).unwrap();
        assert!(near.is_linear() && !near.is_identity());
        let p = Pipeline::from_stages(vec![Stage::curves(vec![near]).unwrap()], None).unwrap();
        let back = parse_mpet(&write_mpet(&p).unwrap(), None).unwrap();
        let Stage::Curves(curves) = &back.stages()[0] else {
            panic!("expected curves");
        };
        assert!((curves[0].evaluate(0.5) - 0.5001).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_survives() {
        let p = Pipeline::from_stages(
            vec![
                Stage::Matrix(MatrixStage::new(1, 1, &[2.0], None).unwrap()),
                Stage::Clamp(1),
            ],
            None,
        )
        .unwrap();
        let back = parse_mpet(&write_mpet(&p).unwrap(), None).unwrap();
        assert!((back.evaluate(&[0.75]).unwrap()[0] - 1.0).abs() < 1e-6);
        assert!((back.evaluate(&[0.25]).unwrap()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_pcs_stage_rejected() {
        let p = Pipeline::from_stages(vec![Stage::LabToXyz], None).unwrap();
        assert!(write_mpet(&p).is_err());
    }

    #[test]
    fn test_nan_matrix_is_corrupt() {
        let p = Pipeline::from_stages(
            vec![Stage::Matrix(MatrixStage::new(1, 1, &[2.0], None).unwrap())],
            None,
        )
        .unwrap();
        let mut bytes = write_mpet(&p).unwrap();
        let at = bytes.windows(4).position(|w| w == b"matf").unwrap() + 12;
        bytes[at..at + 4].copy_from_slice(&f32::NAN.to_be_bytes());
        let err = parse_mpet(&bytes, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptData);
    }

    #[test]
    fn test_element_out_of_bounds() {
        let p = Pipeline::from_stages(vec![Stage::identity_curves(1).unwrap()], None).unwrap();
        let bytes = write_mpet(&p).unwrap();
        assert!(parse_mpet(&bytes[..bytes.len() - 4], None).is_err());
    }
}
