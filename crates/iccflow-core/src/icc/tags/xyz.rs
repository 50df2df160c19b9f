//! XYZ and sf32 Tag Types
//!
//! The XYZType contains an array of XYZ values. Used for colorant tags,
//! white point, black point, etc. Only the first value is surfaced.
//!
//! See ICC.1:2022 Sections 10.31 (XYZ) and 10.22 (sf32)

use crate::color::Xyz;
use crate::icc::error::IccError;
use crate::icc::types::{TypeSignature, WriteBe, XyzNumber};
use crate::math::Matrix3x3;

use super::text::type_header;

/// Parse the first XYZ value of an 'XYZ ' tag
pub fn parse_xyz(data: &[u8]) -> Result<Xyz, IccError> {
    IccError::ensure("XYZ tag", data, 20)?;
    XyzNumber::from_bytes(&data[8..20])
        .map(|n| n.to_xyz())
        .ok_or_else(|| IccError::CorruptedData("XYZ tag has no values".to_string()))
}

/// Write an 'XYZ ' tag holding one value
pub fn write_xyz(xyz: Xyz) -> Vec<u8> {
    let mut out = type_header(TypeSignature::XYZ);
    out.extend_from_slice(&XyzNumber::from_xyz(xyz).to_bytes());
    out
}

/// Parse an 'sf32' tag as a row-major 3×3 matrix
pub fn parse_sf32_matrix(data: &[u8]) -> Result<Matrix3x3, IccError> {
    IccError::ensure("sf32 matrix", data, 8 + 36)?;
    let values: Vec<f64> = data[8..8 + 36]
        .chunks_exact(4)
        .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64 / 65536.0)
        .collect();
    Matrix3x3::from_row_major(&values)
        .ok_or_else(|| IccError::CorruptedData("sf32 matrix needs 9 values".to_string()))
}

/// Write an 'sf32' tag from a 3×3 matrix
pub fn write_sf32_matrix(m: &Matrix3x3) -> Vec<u8> {
    let mut out = type_header(TypeSignature::SF32);
    for v in m.to_row_major() {
        out.put_s15f16(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xyz_tag() {
        let mut data = type_header(TypeSignature::XYZ);
        data.extend_from_slice(&[
            0x00, 0x00, 0xF6, 0xD6, // X = 0.9642
            0x00, 0x01, 0x00, 0x00, // Y = 1.0
            0x00, 0x00, 0xD3, 0x2D, // Z = 0.8249
        ]);

        let xyz = parse_xyz(&data).unwrap();
        assert!((xyz.x - 0.9642).abs() < 0.0001);
        assert!((xyz.y - 1.0).abs() < 1e-9);
        assert!((xyz.z - 0.8249).abs() < 0.0001);
    }

    #[test]
    fn test_parse_xyz_too_small() {
        let mut data = type_header(TypeSignature::XYZ);
        data.extend_from_slice(&[0, 0, 0, 0]);
        assert!(parse_xyz(&data).is_err());
    }

    #[test]
    fn test_write_xyz_layout() {
        let data = write_xyz(Xyz::new(1.0, 0.5, 0.0));
        assert_eq!(data.len(), 20);
        assert_eq!(&data[..4], b"XYZ ");
        assert_eq!(&data[8..12], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&data[12..16], &[0x00, 0x00, 0x80, 0x00]);
    }

    #[test]
    fn test_sf32_roundtrip() {
        let m = Matrix3x3::new([[1.0479, 0.0229, -0.0502], [0.0296, 0.9904, -0.0171], [-0.0092, 0.0151, 0.7519]]);
        let back = parse_sf32_matrix(&write_sf32_matrix(&m)).unwrap();
        assert!(back.approx_eq(&m, 1.0 / 65536.0));
    }
}
