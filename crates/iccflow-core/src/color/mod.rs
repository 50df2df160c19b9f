//! Colorimetric value types
//!
//! - CIE XYZ and xyY
//! - CIELAB (L*a*b*)
//! - Standard white points

pub mod lab;
pub mod white_point;
pub mod xyz;

pub use lab::Lab;
pub use white_point::{D50, D65, WhitePoint};
pub use xyz::{XyY, Xyz};
