//! Black Point Compensation (BPC)
//!
//! Black point compensation adjusts the transform to map the source profile's
//! black point to the destination profile's black point. This prevents crushing
//! of dark tones when converting between spaces with different black points.
//!
//! # Algorithm
//!
//! BPC performs a linear scaling in XYZ space:
//! - Calculate the offset from D50 white point for source and destination black points
//! - Scale XYZ values to map source black → destination black while preserving white
//!
//! The result is compiled into one matrix stage placed between the two
//! profiles' tables, so pixel evaluation never branches on it.

use crate::color::Xyz;
use crate::color::white_point::D50;
use crate::math::Matrix3x3;

use super::stages::{MAX_ENCODEABLE_XYZ, MatrixStage, Stage};

/// Black point compensation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpcParams {
    /// Scale factors for XYZ
    pub scale: [f64; 3],
    /// Offset for XYZ
    pub offset: [f64; 3],
}

impl BpcParams {
    /// Calculate BPC parameters from source and destination black points
    ///
    /// Returns None if compensation is not needed or not possible.
    pub fn calculate(src_bp: Xyz, dst_bp: Xyz) -> Option<Self> {
        let wp = D50.xyz;

        let tx = src_bp.x - wp.x;
        let ty = src_bp.y - wp.y;
        let tz = src_bp.z - wp.z;

        // Source black at the white point leaves nothing to scale
        if tx.abs() < 1e-10 || ty.abs() < 1e-10 || tz.abs() < 1e-10 {
            return None;
        }
        if src_bp.approx_eq(&dst_bp, 1e-9) {
            return None;
        }

        let scale = [
            (dst_bp.x - wp.x) / tx,
            (dst_bp.y - wp.y) / ty,
            (dst_bp.z - wp.z) / tz,
        ];

        let offset = [
            -wp.x * (dst_bp.x - src_bp.x) / tx,
            -wp.y * (dst_bp.y - src_bp.y) / ty,
            -wp.z * (dst_bp.z - src_bp.z) / tz,
        ];

        Some(Self { scale, offset })
    }

    /// Apply BPC to an XYZ value
    #[inline]
    pub fn apply(&self, xyz: [f64; 3]) -> [f64; 3] {
        [
            self.offset[0] + xyz[0] * self.scale[0],
            self.offset[1] + xyz[1] * self.scale[1],
            self.offset[2] + xyz[2] * self.scale[2],
        ]
    }

    /// Matrix stage performing [`Self::apply`] on encoded XYZ
    ///
    /// The scale is unchanged by the encoding; the offset is divided by
    /// the encoding range.
    pub fn to_stage(&self) -> Stage {
        let [sx, sy, sz] = self.scale;
        Stage::Matrix(MatrixStage::from_matrix3(
            &Matrix3x3::diagonal(sx, sy, sz),
            Some(self.offset.map(|o| o / MAX_ENCODEABLE_XYZ)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Precision, decode_xyz, encode_xyz};

    #[test]
    fn test_bpc_same_black_points_needs_nothing() {
        let bp = Xyz::new(0.01, 0.01, 0.01);
        assert!(BpcParams::calculate(bp, bp).is_none());
    }

    #[test]
    fn test_bpc_preserves_white() {
        let src_bp = Xyz::new(0.01, 0.01, 0.01);
        let dst_bp = Xyz::new(0.02, 0.02, 0.02);
        let params = BpcParams::calculate(src_bp, dst_bp).unwrap();

        let wp = D50.xyz;
        let output = params.apply([wp.x, wp.y, wp.z]);
        assert!((output[0] - wp.x).abs() < 1e-9, "White X: {} vs {}", output[0], wp.x);
        assert!((output[1] - wp.y).abs() < 1e-9, "White Y: {} vs {}", output[1], wp.y);
        assert!((output[2] - wp.z).abs() < 1e-9, "White Z: {} vs {}", output[2], wp.z);
    }

    #[test]
    fn test_bpc_maps_black() {
        let src_bp = Xyz::new(0.0, 0.0, 0.0);
        let dst_bp = Xyz::new(0.0034, 0.0035, 0.0029);
        let params = BpcParams::calculate(src_bp, dst_bp).unwrap();
        let output = params.apply([0.0, 0.0, 0.0]);
        assert!((output[0] - dst_bp.x).abs() < 1e-9);
        assert!((output[1] - dst_bp.y).abs() < 1e-9);
        assert!((output[2] - dst_bp.z).abs() < 1e-9);
    }

    #[test]
    fn test_stage_matches_apply() {
        let params =
            BpcParams::calculate(Xyz::new(0.0, 0.0, 0.0), Xyz::new(0.01, 0.012, 0.009)).unwrap();
        let stage = params.to_stage();
        let xyz = Xyz::new(0.3, 0.4, 0.2);
        let mut out = [0.0; 3];
        stage.eval(&encode_xyz(xyz), &mut out, Precision::Float);
        let got = decode_xyz(&out);
        let expected = params.apply(xyz.to_array());
        assert!((got.x - expected[0]).abs() < 1e-12);
        assert!((got.y - expected[1]).abs() < 1e-12);
        assert!((got.z - expected[2]).abs() < 1e-12);
    }
}
