//! ICC Profile Binary Format
//!
//! This module reads and writes the ICC.1:2022 container.
//!
//! # Structure
//!
//! An ICC profile consists of:
//! 1. A 128-byte header
//! 2. A tag table listing all tags
//! 3. Tag data (may be shared between tags)
//!
//! [`TagStore`] owns the table and the payloads; [`tags`] holds one codec
//! per supported tag type.

pub mod header;
pub mod tags;

mod error;
mod store;
pub(crate) mod types;

pub use error::IccError;
pub use header::{ColorSpace, IccHeader, ProfileClass, ProfileVersion, RenderingIntent};
pub use store::TagStore;
pub use tags::{TagValue, TagValueType};
pub use types::{DateTimeNumber, S15Fixed16, TagSignature, TypeSignature, XyzNumber};
