//! # iccflow-tests
//!
//! Scenario and property tests that cross module boundaries of
//! `iccflow-core`.
//!
//! This crate provides:
//! - Deterministic pixel buffers for every supported layout
//! - Synthesized profiles covering matrix-shaper, LUT-based and device
//!   link models
//! - deltaE measurements for judging transform accuracy
//!
//! ## Test Categories
//!
//! 1. **Profile round trips**: save, parse, link and remove tags
//! 2. **Identity transforms**: a profile against itself
//! 3. **Pipeline properties**: stage composition and optimization
//! 4. **Concurrency**: one transform shared across threads
//! 5. **Device links**: ink limiting and multi-profile chains

pub mod accuracy;
pub mod fixtures;
pub mod patterns;

pub use accuracy::{DeltaEStats, delta_e_2000, max_channel_diff};
pub use patterns::{TestPattern, generate_pattern};
