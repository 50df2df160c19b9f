//! Pipeline Stages
//!
//! Individual components of a color transform pipeline. Every stage reads
//! and writes values in the normalized float encoding:
//!
//! - device channels in [0, 1]
//! - Lab as `(L / 100, (a + 128) / 255, (b + 128) / 255)`
//! - XYZ divided by [`MAX_ENCODEABLE_XYZ`]

use crate::color::{Lab, Xyz};
use crate::curve::ToneCurve;
use crate::error::{Error, Result};
use crate::math::Matrix3x3;

use super::clut::ClutStage;

/// Maximum channel count for any stage or pipeline
pub const MAX_CHANNELS: usize = 16;

/// Largest XYZ component representable in the 16-bit PCS encoding
pub const MAX_ENCODEABLE_XYZ: f64 = 1.0 + 32767.0 / 32768.0;

/// Arithmetic used by matrix stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Double-precision float
    #[default]
    Float,
    /// s15.16 fixed-point coefficients applied to 16-bit quantized inputs
    Fixed16,
}

/// A pipeline stage
#[derive(Debug, Clone)]
pub enum Stage {
    /// One tone curve per channel
    Curves(Vec<ToneCurve>),
    /// `output = M × input + offset`
    Matrix(MatrixStage),
    /// Multidimensional lookup table
    Clut(ClutStage),
    /// Pass-through of `n` channels
    Identity(usize),
    /// Encoded Lab to encoded XYZ, both relative to D50
    LabToXyz,
    /// Encoded XYZ to encoded Lab, both relative to D50
    XyzToLab,
    /// Clamp `n` channels to [0, 1]
    Clamp(usize),
}

impl Stage {
    /// Curve-set stage; the channel count is the number of curves
    pub fn curves(curves: Vec<ToneCurve>) -> Result<Self> {
        if curves.is_empty() || curves.len() > MAX_CHANNELS {
            return Err(Error::invalid(format!(
                "a curve stage needs 1 to {} curves, got {}",
                MAX_CHANNELS,
                curves.len()
            )));
        }
        Ok(Self::Curves(curves))
    }

    /// `n` identity curves
    pub fn identity_curves(n: usize) -> Result<Self> {
        Self::curves(vec![ToneCurve::identity(); n])
    }

    pub fn input_channels(&self) -> usize {
        match self {
            Self::Curves(c) => c.len(),
            Self::Matrix(m) => m.cols,
            Self::Clut(c) => c.inputs(),
            Self::Identity(n) | Self::Clamp(n) => *n,
            Self::LabToXyz | Self::XyzToLab => 3,
        }
    }

    pub fn output_channels(&self) -> usize {
        match self {
            Self::Curves(c) => c.len(),
            Self::Matrix(m) => m.rows,
            Self::Clut(c) => c.outputs(),
            Self::Identity(n) | Self::Clamp(n) => *n,
            Self::LabToXyz | Self::XyzToLab => 3,
        }
    }

    /// True if the stage leaves every value unchanged
    pub fn is_identity(&self) -> bool {
        match self {
            Self::Identity(_) => true,
            Self::Curves(curves) => curves.iter().all(ToneCurve::is_identity),
            Self::Matrix(m) => m.is_identity(),
            _ => false,
        }
    }

    /// Evaluate one vector
    ///
    /// `input` holds [`Self::input_channels`] values and `output` holds
    /// [`Self::output_channels`].
    pub fn eval(&self, input: &[f64], output: &mut [f64], precision: Precision) {
        match self {
            Self::Curves(curves) => {
                for ((out, &x), curve) in output.iter_mut().zip(input).zip(curves) {
                    *out = curve.evaluate(x);
                }
            }
            Self::Matrix(m) => match precision {
                Precision::Float => m.eval(input, output),
                Precision::Fixed16 => m.eval_fixed(input, output),
            },
            Self::Clut(c) => c.eval(input, output),
            Self::Identity(_) => output.copy_from_slice(input),
            Self::Clamp(_) => {
                for (out, &x) in output.iter_mut().zip(input) {
                    *out = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
                }
            }
            Self::LabToXyz => {
                let xyz = decode_lab(input).to_xyz();
                output.copy_from_slice(&encode_xyz(xyz));
            }
            Self::XyzToLab => {
                let lab = Lab::from_xyz(decode_xyz(input));
                output.copy_from_slice(&encode_lab(lab));
            }
        }
    }

    /// Short lowercase name for log output
    pub fn name(&self) -> &'static str {
        match self {
            Self::Curves(_) => "curves",
            Self::Matrix(_) => "matrix",
            Self::Clut(_) => "clut",
            Self::Identity(_) => "identity",
            Self::LabToXyz => "lab2xyz",
            Self::XyzToLab => "xyz2lab",
            Self::Clamp(_) => "clamp",
        }
    }
}

/// General `rows × cols` matrix with an optional offset
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixStage {
    rows: usize,
    cols: usize,
    /// Row-major coefficients
    coeffs: Vec<f64>,
    offset: Vec<f64>,
}

impl MatrixStage {
    /// Build from row-major coefficients
    pub fn new(rows: usize, cols: usize, coeffs: &[f64], offset: Option<&[f64]>) -> Result<Self> {
        if rows == 0 || cols == 0 || rows > MAX_CHANNELS || cols > MAX_CHANNELS {
            return Err(Error::invalid(format!(
                "matrix dimensions {}x{} out of range",
                rows, cols
            )));
        }
        if coeffs.len() != rows * cols {
            return Err(Error::invalid(format!(
                "{}x{} matrix needs {} coefficients, got {}",
                rows,
                cols,
                rows * cols,
                coeffs.len()
            )));
        }
        let offset = match offset {
            Some(o) if o.len() != rows => {
                return Err(Error::invalid(format!(
                    "matrix offset needs {} values, got {}",
                    rows,
                    o.len()
                )));
            }
            Some(o) => o.to_vec(),
            None => vec![0.0; rows],
        };
        if coeffs.iter().chain(&offset).any(|v| !v.is_finite()) {
            return Err(Error::invalid("matrix coefficients must be finite"));
        }
        Ok(Self {
            rows,
            cols,
            coeffs: coeffs.to_vec(),
            offset,
        })
    }

    /// Square 3×3 matrix
    pub fn from_matrix3(m: &Matrix3x3, offset: Option<[f64; 3]>) -> Self {
        Self {
            rows: 3,
            cols: 3,
            coeffs: m.to_row_major().to_vec(),
            offset: offset.unwrap_or([0.0; 3]).to_vec(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn offset(&self) -> &[f64] {
        &self.offset
    }

    /// Square matrix equal to the identity with zero offset
    pub fn is_identity(&self) -> bool {
        const EPS: f64 = 1e-9;
        self.rows == self.cols
            && self.offset.iter().all(|o| o.abs() < EPS)
            && self.coeffs.iter().enumerate().all(|(i, &v)| {
                let expected = if i / self.cols == i % self.cols { 1.0 } else { 0.0 };
                (v - expected).abs() < EPS
            })
    }

    /// The matrix applying `self` first and `next` second
    ///
    /// Returns None when the dimensions do not chain.
    pub fn then(&self, next: &MatrixStage) -> Option<MatrixStage> {
        if next.cols != self.rows {
            return None;
        }
        let mut coeffs = vec![0.0; next.rows * self.cols];
        let mut offset = next.offset.clone();
        for r in 0..next.rows {
            for c in 0..self.cols {
                coeffs[r * self.cols + c] = (0..self.rows)
                    .map(|k| next.coeffs[r * next.cols + k] * self.coeffs[k * self.cols + c])
                    .sum();
            }
            offset[r] += (0..self.rows)
                .map(|k| next.coeffs[r * next.cols + k] * self.offset[k])
                .sum::<f64>();
        }
        Some(MatrixStage {
            rows: next.rows,
            cols: self.cols,
            coeffs,
            offset,
        })
    }

    #[inline]
    fn eval(&self, input: &[f64], output: &mut [f64]) {
        for (r, out) in output.iter_mut().enumerate().take(self.rows) {
            let row = &self.coeffs[r * self.cols..(r + 1) * self.cols];
            *out = row.iter().zip(input).map(|(m, x)| m * x).sum::<f64>() + self.offset[r];
        }
    }

    /// 16.16 fixed-point evaluation on inputs quantized to 16 bits
    #[inline]
    fn eval_fixed(&self, input: &[f64], output: &mut [f64]) {
        const ONE: f64 = 65536.0;
        let mut quantized = [0i64; MAX_CHANNELS];
        for (q, &x) in quantized.iter_mut().zip(input) {
            let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
            *q = (x * 65535.0).round() as i64;
        }
        for (r, out) in output.iter_mut().enumerate().take(self.rows) {
            let row = &self.coeffs[r * self.cols..(r + 1) * self.cols];
            let mut acc: i64 = row
                .iter()
                .zip(&quantized)
                .map(|(m, q)| (m * ONE).round() as i64 * q)
                .sum();
            acc += (self.offset[r] * ONE).round() as i64 * 65535;
            *out = acc as f64 / (ONE * 65535.0);
        }
    }
}

/// Encoded Lab vector to Lab
#[inline]
pub fn decode_lab(v: &[f64]) -> Lab {
    Lab::new(v[0] * 100.0, v[1] * 255.0 - 128.0, v[2] * 255.0 - 128.0)
}

/// Lab to its encoded vector
#[inline]
pub fn encode_lab(lab: Lab) -> [f64; 3] {
    [lab.l / 100.0, (lab.a + 128.0) / 255.0, (lab.b + 128.0) / 255.0]
}

/// Encoded XYZ vector to XYZ
#[inline]
pub fn decode_xyz(v: &[f64]) -> Xyz {
    Xyz::new(
        v[0] * MAX_ENCODEABLE_XYZ,
        v[1] * MAX_ENCODEABLE_XYZ,
        v[2] * MAX_ENCODEABLE_XYZ,
    )
}

/// XYZ to its encoded vector
#[inline]
pub fn encode_xyz(xyz: Xyz) -> [f64; 3] {
    [
        xyz.x / MAX_ENCODEABLE_XYZ,
        xyz.y / MAX_ENCODEABLE_XYZ,
        xyz.z / MAX_ENCODEABLE_XYZ,
    ]
}
