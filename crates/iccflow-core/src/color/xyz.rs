//! CIE XYZ and xyY
//!
//! XYZ is the colorimetric connection space of the engine; xyY is how the
//! synthesizing constructors take white points and primaries.

use std::ops::{Add, Mul, Sub};

/// CIE 1931 XYZ color coordinates
///
/// Y = 1.0 is the luminance of the reference white.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    /// Create a new XYZ color
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn from_array(arr: [f64; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }

    #[inline]
    pub const fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Scale all components by a factor
    #[inline]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            z: self.z * factor,
        }
    }

    /// Convert to xyY chromaticity coordinates
    pub fn to_xyy(&self) -> XyY {
        let sum = self.x + self.y + self.z;
        if sum > 0.0 {
            XyY::new(self.x / sum, self.y / sum, self.y)
        } else {
            XyY::new(0.0, 0.0, 0.0)
        }
    }

    /// Check if approximately equal to another XYZ color
    #[inline]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self.x - other.x).abs() < epsilon
            && (self.y - other.y).abs() < epsilon
            && (self.z - other.z).abs() < epsilon
    }
}

impl From<[f64; 3]> for Xyz {
    fn from(arr: [f64; 3]) -> Self {
        Self::from_array(arr)
    }
}

impl Add for Xyz {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Xyz {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Xyz {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

/// CIE xyY: chromaticity plus luminance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XyY {
    pub x: f64,
    pub y: f64,
    /// Luminance
    pub big_y: f64,
}

impl XyY {
    #[inline]
    pub const fn new(x: f64, y: f64, big_y: f64) -> Self {
        Self { x, y, big_y }
    }

    /// Convert to XYZ; a zero `y` chromaticity maps to black
    pub fn to_xyz(&self) -> Xyz {
        if self.y > 0.0 {
            Xyz::new(
                (self.x * self.big_y) / self.y,
                self.big_y,
                ((1.0 - self.x - self.y) * self.big_y) / self.y,
            )
        } else {
            Xyz::new(0.0, 0.0, 0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xyy_roundtrip() {
        let original = Xyz::new(0.5, 0.6, 0.7);
        let roundtrip = original.to_xyy().to_xyz();
        assert!(original.approx_eq(&roundtrip, 1e-10));
    }

    #[test]
    fn test_arithmetic() {
        let a = Xyz::new(1.0, 2.0, 3.0);
        let b = Xyz::new(0.1, 0.2, 0.3);

        assert!((a + b).approx_eq(&Xyz::new(1.1, 2.2, 3.3), 1e-10));
        assert!((a - b).approx_eq(&Xyz::new(0.9, 1.8, 2.7), 1e-10));
        assert!((a * 2.0).approx_eq(&Xyz::new(2.0, 4.0, 6.0), 1e-10));
    }

    #[test]
    fn test_zero_chromaticity_is_black() {
        assert_eq!(XyY::new(0.3, 0.0, 1.0).to_xyz(), Xyz::default());
    }
}
