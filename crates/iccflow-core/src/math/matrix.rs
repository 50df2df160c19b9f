//! 3x3 Matrix operations for color space transforms
//!
//! These matrices are used for RGB↔XYZ conversions and chromatic adaptation.
//! All operations use f64.

use std::ops::{Index, IndexMut, Mul};

use crate::color::{XyY, Xyz};

/// A 3x3 matrix for color space transformations
///
/// Stored in row-major order: m[row][col]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3x3 {
    pub m: [[f64; 3]; 3],
}

impl Matrix3x3 {
    #[inline]
    pub const fn new(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { m: [[0.0; 3]; 3] }
    }

    #[inline]
    pub const fn diagonal(d0: f64, d1: f64, d2: f64) -> Self {
        Self {
            m: [[d0, 0.0, 0.0], [0.0, d1, 0.0], [0.0, 0.0, d2]],
        }
    }

    /// Build from column vectors
    pub const fn from_columns(c0: [f64; 3], c1: [f64; 3], c2: [f64; 3]) -> Self {
        Self {
            m: [
                [c0[0], c1[0], c2[0]],
                [c0[1], c1[1], c2[1]],
                [c0[2], c1[2], c2[2]],
            ],
        }
    }

    /// Build from 9 row-major values
    pub fn from_row_major(values: &[f64]) -> Option<Self> {
        if values.len() != 9 {
            return None;
        }
        let mut m = [[0.0; 3]; 3];
        for (i, v) in values.iter().enumerate() {
            m[i / 3][i % 3] = *v;
        }
        Some(Self { m })
    }

    pub fn to_row_major(&self) -> [f64; 9] {
        let mut out = [0.0; 9];
        for i in 0..9 {
            out[i] = self.m[i / 3][i % 3];
        }
        out
    }

    /// Returns M × v
    #[inline]
    pub fn multiply_vec(&self, v: [f64; 3]) -> [f64; 3] {
        [
            self.m[0][0] * v[0] + self.m[0][1] * v[1] + self.m[0][2] * v[2],
            self.m[1][0] * v[0] + self.m[1][1] * v[1] + self.m[1][2] * v[2],
            self.m[2][0] * v[0] + self.m[2][1] * v[1] + self.m[2][2] * v[2],
        ]
    }

    /// Returns self × other
    #[inline]
    pub fn multiply(&self, other: &Self) -> Self {
        let mut result = Self::zero();
        for i in 0..3 {
            for j in 0..3 {
                result.m[i][j] = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j];
            }
        }
        result
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Returns None if the matrix is singular (determinant ≈ 0)
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < 1e-14 {
            return None;
        }

        let inv_det = 1.0 / det;
        let m = &self.m;

        Some(Self {
            m: [
                [
                    (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                    (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                    (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
                ],
                [
                    (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                    (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                    (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
                ],
                [
                    (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                    (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                    (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
                ],
            ],
        })
    }

    #[inline]
    pub fn scale(&self, s: f64) -> Self {
        let mut out = *self;
        for row in out.m.iter_mut() {
            for v in row.iter_mut() {
                *v *= s;
            }
        }
        out
    }

    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.approx_eq(&Self::identity(), epsilon)
    }
}

impl Default for Matrix3x3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Index<usize> for Matrix3x3 {
    type Output = [f64; 3];

    fn index(&self, row: usize) -> &Self::Output {
        &self.m[row]
    }
}

impl IndexMut<usize> for Matrix3x3 {
    fn index_mut(&mut self, row: usize) -> &mut Self::Output {
        &mut self.m[row]
    }
}

impl Mul for Matrix3x3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.multiply(&rhs)
    }
}

impl Mul<[f64; 3]> for Matrix3x3 {
    type Output = [f64; 3];

    fn mul(self, rhs: [f64; 3]) -> Self::Output {
        self.multiply_vec(rhs)
    }
}

/// RGB → XYZ matrix for the given primaries, scaled so RGB (1,1,1) maps
/// to `white`
///
/// Returns None when the primaries are degenerate.
pub fn rgb_to_xyz_matrix(white: XyY, primaries: [XyY; 3]) -> Option<Matrix3x3> {
    let columns = primaries.map(|p| XyY::new(p.x, p.y, 1.0).to_xyz().to_array());
    let m = Matrix3x3::from_columns(columns[0], columns[1], columns[2]);

    let w = XyY::new(white.x, white.y, 1.0).to_xyz();
    let s = m.inverse()?.multiply_vec(w.to_array());

    Some(m.multiply(&Matrix3x3::diagonal(s[0], s[1], s[2])))
}

/// The XYZ of each column, red first
pub fn columns(m: &Matrix3x3) -> [Xyz; 3] {
    [0, 1, 2].map(|c| Xyz::new(m.m[0][c], m.m[1][c], m.m[2][c]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_identity() {
        let v = [1.0, 2.0, 3.0];
        let result = Matrix3x3::identity().multiply_vec(v);
        assert_eq!(result, v);
    }

    #[test]
    fn test_inverse() {
        let id = Matrix3x3::identity();
        let a = Matrix3x3::new([[1.0, 2.0, 3.0], [0.0, 1.0, 4.0], [5.0, 6.0, 0.0]]);
        let a_inv = a.inverse().unwrap();
        assert!(a.multiply(&a_inv).approx_eq(&id, 1e-9));
        assert!((a.determinant() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_singular_matrix() {
        // row 3 = row 1 + row 2
        let singular = Matrix3x3::new([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [5.0, 7.0, 9.0]]);
        assert!(singular.inverse().is_none());
    }

    #[test]
    fn test_row_major_roundtrip() {
        let a = Matrix3x3::new([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let flat = a.to_row_major();
        assert_eq!(Matrix3x3::from_row_major(&flat), Some(a));
        assert!(Matrix3x3::from_row_major(&flat[..8]).is_none());
    }

    #[test]
    fn test_srgb_primaries_matrix() {
        let white = XyY::new(0.3127, 0.3290, 1.0);
        let primaries = [
            XyY::new(0.64, 0.33, 1.0),
            XyY::new(0.30, 0.60, 1.0),
            XyY::new(0.15, 0.06, 1.0),
        ];
        let m = rgb_to_xyz_matrix(white, primaries).unwrap();

        // Matches the IEC 61966-2-1 matrix
        assert!((m.m[0][0] - 0.4124).abs() < 1e-3);
        assert!((m.m[1][1] - 0.7152).abs() < 1e-3);
        assert!((m.m[2][2] - 0.9505).abs() < 1e-3);

        let w = m.multiply_vec([1.0, 1.0, 1.0]);
        assert!((w[1] - 1.0).abs() < EPSILON);
        assert!((columns(&m)[1].y - m.m[1][1]).abs() < EPSILON);
    }
}
