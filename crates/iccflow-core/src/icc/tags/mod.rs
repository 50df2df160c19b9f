//! ICC Profile Tag Types
//!
//! Tags contain the actual profile data. Each tag has:
//! - A 4-byte type signature identifying the data format
//! - Reserved bytes
//! - Type-specific data
//!
//! [`decode`] picks the decoder from the stored type signature and
//! [`encode`] picks the type that suits the value and profile version.
//!
//! See ICC.1:2022 Section 10.

mod curves;
mod lut;
mod mpet;
mod named;
mod text;
mod xyz;

pub use curves::{parse_curve, write_curve};
pub use lut::{LutDirection, parse_lut_ab, parse_lut8, parse_lut16};
pub use mpet::{parse_mpet, write_mpet};
pub use named::{parse_ncl2, write_ncl2};
pub use text::{parse_desc, parse_mluc, parse_mluc_records, parse_text, write_desc, write_mluc, write_text};
pub use xyz::{parse_sf32_matrix, parse_xyz, write_sf32_matrix, write_xyz};

use super::error::IccError;
use super::header::ProfileVersion;
use super::types::{TagSignature, TypeSignature};
use crate::color::Xyz;
use crate::context::Context;
use crate::curve::ToneCurve;
use crate::error::{Error, Result};
use crate::math::Matrix3x3;
use crate::named_color::NamedColorList;
use crate::pipeline::Pipeline;

/// A decoded tag
#[derive(Debug, Clone)]
pub enum TagValue {
    /// XYZ type data (colorants, white point)
    Xyz(Xyz),
    /// Tone reproduction curve
    Curve(ToneCurve),
    /// Any lut type
    Pipeline(Pipeline),
    /// Chromatic adaptation matrix (sf32)
    Matrix(Matrix3x3),
    /// Text, description or localized text
    Text(String),
    /// Named color palette
    NamedColors(NamedColorList),
    /// A type this crate keeps as bytes only
    Raw(TypeSignature),
}

/// Types that can be read out of a [`TagValue`]
///
/// Reading a tag as the wrong type yields `None`, the same as reading an
/// absent tag.
pub trait TagValueType: Sized {
    fn from_tag_value(value: &TagValue) -> Option<Self>;
}

macro_rules! tag_value_type {
    ($ty:ty, $variant:ident) => {
        impl TagValueType for $ty {
            fn from_tag_value(value: &TagValue) -> Option<Self> {
                match value {
                    TagValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for TagValue {
            fn from(v: $ty) -> Self {
                TagValue::$variant(v)
            }
        }
    };
}

tag_value_type!(Xyz, Xyz);
tag_value_type!(ToneCurve, Curve);
tag_value_type!(Pipeline, Pipeline);
tag_value_type!(Matrix3x3, Matrix);
tag_value_type!(String, Text);
tag_value_type!(NamedColorList, NamedColors);

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Text(s.to_string())
    }
}

/// Type signature of a whole tag
pub fn type_signature(data: &[u8]) -> Result<TypeSignature> {
    IccError::ensure("tag type", data, 8)?;
    Ok(TypeSignature(u32::from_be_bytes([data[0], data[1], data[2], data[3]])))
}

/// Decode a whole tag, type header included
///
/// Payloads that would build an invalid curve, pipeline or list are
/// reported as [`Error::CorruptData`].
pub fn decode(data: &[u8], ctx: Option<&Context>) -> Result<TagValue> {
    let sig = type_signature(data)?;
    decode_as(sig, data, ctx).map_err(malformed("tag payload"))
}

/// Turn a constructor failure met while decoding into `CorruptData`
pub(crate) fn malformed(what: &'static str) -> impl Fn(Error) -> Error {
    move |err| match err {
        Error::CorruptData(_) => err,
        other => Error::corrupt(format!("{}: {}", what, other)),
    }
}

fn decode_as(sig: TypeSignature, data: &[u8], ctx: Option<&Context>) -> Result<TagValue> {
    let value = match sig {
        TypeSignature::XYZ => TagValue::Xyz(parse_xyz(data)?),
        TypeSignature::CURVE | TypeSignature::PARA => TagValue::Curve(parse_curve(data, ctx)?),
        TypeSignature::LUT8 => TagValue::Pipeline(parse_lut8(data, ctx)?),
        TypeSignature::LUT16 => TagValue::Pipeline(parse_lut16(data, ctx)?),
        TypeSignature::LUTA2B => TagValue::Pipeline(parse_lut_ab(data, LutDirection::AToB, ctx)?),
        TypeSignature::LUTB2A => TagValue::Pipeline(parse_lut_ab(data, LutDirection::BToA, ctx)?),
        TypeSignature::MPET => TagValue::Pipeline(parse_mpet(data, ctx)?),
        TypeSignature::SF32 => TagValue::Matrix(parse_sf32_matrix(data)?),
        TypeSignature::TEXT => TagValue::Text(parse_text(data)?),
        TypeSignature::DESC => TagValue::Text(parse_desc(data)?),
        TypeSignature::MLUC => TagValue::Text(parse_mluc(data)?),
        TypeSignature::NAMED_COLOR2 => TagValue::NamedColors(parse_ncl2(data, ctx)?),
        other => TagValue::Raw(other),
    };
    Ok(value)
}

/// Tags that v2 profiles store as 'desc' rather than 'text'
fn is_description(sig: TagSignature) -> bool {
    matches!(
        sig,
        TagSignature::PROFILE_DESC | TagSignature::DMND | TagSignature::DMDD
    )
}

/// Encode `value` for tag `sig` in a profile of `version`
pub fn encode(value: &TagValue, sig: TagSignature, version: ProfileVersion) -> Result<Vec<u8>> {
    let bytes = match value {
        TagValue::Xyz(xyz) => write_xyz(*xyz),
        TagValue::Curve(curve) => write_curve(curve, version),
        TagValue::Pipeline(pipeline) => write_mpet(pipeline)?,
        TagValue::Matrix(m) => write_sf32_matrix(m),
        TagValue::Text(s) if version.is_v4() => write_mluc(s),
        TagValue::Text(s) if is_description(sig) => write_desc(s),
        TagValue::Text(s) => write_text(s),
        TagValue::NamedColors(list) => write_ncl2(list),
        TagValue::Raw(type_sig) => {
            return Err(Error::invalid(format!(
                "no encoder for type '{}'; store it as raw bytes",
                type_sig
            )));
        }
    };
    Ok(bytes)
}
