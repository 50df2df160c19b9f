//! CIE Standard Illuminant White Points
//!
//! Specified as CIE XYZ coordinates where Y=1.0.

use crate::color::{XyY, Xyz};

/// A white point definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhitePoint {
    /// Name of the illuminant
    pub name: &'static str,
    /// CIE XYZ coordinates (Y normalized to 1.0)
    pub xyz: Xyz,
}

impl WhitePoint {
    pub const fn new(name: &'static str, x: f64, y: f64, z: f64) -> Self {
        Self {
            name,
            xyz: Xyz::new(x, y, z),
        }
    }

    /// Chromaticity with unit luminance
    pub fn xyy(&self) -> XyY {
        let c = self.xyz.to_xyy();
        XyY::new(c.x, c.y, 1.0)
    }
}

/// CIE Standard Illuminant D50, the ICC PCS illuminant (ICC.1:2022 7.2.16)
pub const D50: WhitePoint = WhitePoint::new("D50", 0.9642, 1.0, 0.8249);

/// CIE Standard Illuminant D65, the sRGB white
pub const D65: WhitePoint = WhitePoint::new("D65", 0.95045, 1.0, 1.08905);
