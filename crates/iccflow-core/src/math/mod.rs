//! Mathematical operations for color management
//!
//! - 3x3 matrix operations for RGB↔XYZ transforms
//! - Parametric transfer function evaluation
//! - Chromatic adaptation (Bradford)
//! - Interpolation for curve and CLUT evaluation

pub mod chromatic_adaptation;
pub mod gamma;
pub mod interpolation;
pub mod matrix;

pub use chromatic_adaptation::{adapt_xyz, bradford_matrix};
pub use gamma::{ParametricCurve, ParametricCurveType};
pub use matrix::Matrix3x3;
