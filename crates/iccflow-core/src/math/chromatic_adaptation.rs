//! Chromatic Adaptation
//!
//! Bradford adaptation between white points, the method ICC profiles use
//! for their 'chad' tag.
//!
//! References:
//! - ICC.1:2022 Annex E
//! - Lindbloom: http://www.brucelindbloom.com/index.html?Eqn_ChromAdapt.html

use crate::color::Xyz;
use crate::math::Matrix3x3;

/// Bradford matrix: XYZ → LMS (cone response)
const BRADFORD_XYZ_TO_LMS: Matrix3x3 = Matrix3x3::new([
    [0.8951000, 0.2664000, -0.1614000],
    [-0.7502000, 1.7135000, 0.0367000],
    [0.0389000, -0.0685000, 1.0296000],
]);

/// Bradford adaptation matrix taking colors seen under `src_white` to
/// their appearance under `dst_white`
///
/// XYZ_dest = M × XYZ_src
pub fn bradford_matrix(src_white: Xyz, dst_white: Xyz) -> Matrix3x3 {
    let m_a = BRADFORD_XYZ_TO_LMS;
    let Some(m_a_inv) = m_a.inverse() else {
        return Matrix3x3::identity();
    };

    let src_lms = m_a.multiply_vec(src_white.to_array());
    let dst_lms = m_a.multiply_vec(dst_white.to_array());

    let ratio = |i: usize| {
        if src_lms[i].abs() > 1e-10 {
            dst_lms[i] / src_lms[i]
        } else {
            1.0
        }
    };
    let scale = Matrix3x3::diagonal(ratio(0), ratio(1), ratio(2));

    m_a_inv.multiply(&scale.multiply(&m_a))
}

/// Adapt an XYZ color from one white point to another
#[inline]
pub fn adapt_xyz(xyz: Xyz, src_white: Xyz, dst_white: Xyz) -> Xyz {
    Xyz::from_array(bradford_matrix(src_white, dst_white).multiply_vec(xyz.to_array()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{D50, D65};

    #[test]
    fn test_identity_adaptation() {
        assert!(bradford_matrix(D65.xyz, D65.xyz).is_identity(1e-9));
    }

    #[test]
    fn test_d65_to_d50_known_values() {
        let computed = bradford_matrix(D65.xyz, D50.xyz);
        let expected = Matrix3x3::new([
            [1.0478112, 0.0228866, -0.0501270],
            [0.0295424, 0.9904844, -0.0170491],
            [-0.0092345, 0.0150436, 0.7521316],
        ]);
        assert!(computed.approx_eq(&expected, 1e-2), "{:?}", computed);
    }

    #[test]
    fn test_white_maps_to_white() {
        let adapted = adapt_xyz(D65.xyz, D65.xyz, D50.xyz);
        assert!(adapted.approx_eq(&D50.xyz, 1e-9), "{:?}", adapted);
    }

    #[test]
    fn test_roundtrip() {
        let m1 = bradford_matrix(D65.xyz, D50.xyz);
        let m2 = bradford_matrix(D50.xyz, D65.xyz);
        assert!(m1.multiply(&m2).is_identity(1e-9));
    }
}
