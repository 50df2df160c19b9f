//! # iccflow - ICC profile tag store and transform pipeline engine
//!
//! Parses and writes ICC profiles, decodes their tags into typed values,
//! and compiles chains of profiles into pipelines that transform pixel
//! buffers.
//!
//! ## Layers
//!
//! - [`icc`]: the binary container: header, tag directory, tag codecs
//! - [`Profile`]: header accessors, typed tag access and built-in profiles
//! - [`ToneCurve`] and [`Pipeline`]: the stages profiles decode into
//! - [`ColorTransform`]: a linked, optimized pipeline over pixel buffers
//!
//! ## Quick Start
//!
//! ```no_run
//! use iccflow_core::{ColorTransform, PixelFormat, Profile, RenderingIntent, TransformFlags};
//!
//! let bytes = std::fs::read("display.icc").unwrap();
//! let display = Profile::parse(&bytes, None).unwrap();
//! let srgb = Profile::srgb(None).unwrap();
//!
//! let transform = ColorTransform::compile(
//!     &srgb,
//!     PixelFormat::RGBA_8,
//!     &display,
//!     PixelFormat::RGBA_8,
//!     RenderingIntent::RelativeColorimetric,
//!     TransformFlags::new().with_bpc(),
//!     None,
//! )
//! .unwrap();
//!
//! let out = transform.transform(&[255, 128, 64, 255]).unwrap();
//! assert_eq!(out.len(), 4);
//! ```
//!
//! ## Threading
//!
//! Profiles, pipelines and curves are values with copy-on-write storage.
//! A compiled [`ColorTransform`] is `Send + Sync` and never mutates, so
//! callers can split a buffer across threads and share one transform.

pub mod color;
pub mod context;
pub mod curve;
pub mod error;
pub mod handle;
pub mod icc;
pub mod math;
pub mod named_color;
pub mod pipeline;
pub mod profile;
pub mod transform;

pub use color::{D50, D65, Lab, WhitePoint, XyY, Xyz};
pub use context::{Context, ContextBuilder, ParametricCurvePlugin};
pub use curve::{CurveKind, ToneCurve};
pub use error::{Error, ErrorKind, Result};
pub use handle::{Contextual, Duplicable};
pub use icc::{
    ColorSpace, IccHeader, ProfileClass, ProfileVersion, RenderingIntent, TagSignature, TagValue,
    TagValueType, TypeSignature,
};
pub use math::Matrix3x3;
pub use named_color::{NamedColor, NamedColorList};
pub use pipeline::{ClutStage, Interpolation, MatrixStage, Pipeline, Precision, Stage};
pub use profile::{InfoKind, Profile, TableDirection};
pub use transform::{ColorTransform, PixelFormat, SampleType, TransformFlags};

/// Version of iccflow
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
