//! Low-level ICC parse errors

use std::fmt;

use super::types::TagSignature;

/// Errors raised while reading ICC bytes
///
/// These convert into [`crate::Error::CorruptData`] at the public API.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IccError {
    /// Profile data is too small
    TooSmall { expected: usize, actual: usize },
    /// Invalid profile signature (should be 'acsp')
    InvalidSignature(u32),
    /// Profile size in header doesn't match data
    SizeMismatch {
        header_size: u32,
        actual_size: usize,
    },
    /// Tag offset is out of bounds
    TagOutOfBounds {
        tag: TagSignature,
        offset: u32,
        size: u32,
        profile_size: usize,
    },
    /// Same signature listed twice in the directory
    DuplicateTag(TagSignature),
    /// Payload shorter than its type requires
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    /// Invalid color space
    InvalidColorSpace(u32),
    /// Invalid profile class
    InvalidProfileClass(u32),
    /// Invalid rendering intent
    InvalidRenderingIntent(u32),
    /// Corrupted or invalid data
    CorruptedData(String),
}

impl IccError {
    /// Check that `data` holds at least `needed` bytes
    pub(crate) fn ensure(what: &'static str, data: &[u8], needed: usize) -> Result<(), Self> {
        if data.len() < needed {
            Err(Self::Truncated {
                what,
                needed,
                available: data.len(),
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for IccError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall { expected, actual } => {
                write!(
                    f,
                    "profile too small: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Self::InvalidSignature(sig) => {
                write!(
                    f,
                    "invalid profile signature: 0x{:08X} (expected 'acsp')",
                    sig
                )
            }
            Self::SizeMismatch {
                header_size,
                actual_size,
            } => {
                write!(
                    f,
                    "size mismatch: header says {} bytes, data is {} bytes",
                    header_size, actual_size
                )
            }
            Self::TagOutOfBounds {
                tag,
                offset,
                size,
                profile_size,
            } => {
                write!(
                    f,
                    "tag '{}' out of bounds: offset {} + size {} > profile size {}",
                    tag, offset, size, profile_size
                )
            }
            Self::DuplicateTag(tag) => write!(f, "tag '{}' listed twice", tag),
            Self::Truncated {
                what,
                needed,
                available,
            } => {
                write!(
                    f,
                    "{} truncated: needs {} bytes, {} available",
                    what, needed, available
                )
            }
            Self::InvalidColorSpace(cs) => {
                write!(f, "invalid color space: 0x{:08X}", cs)
            }
            Self::InvalidProfileClass(class) => {
                write!(f, "invalid profile class: 0x{:08X}", class)
            }
            Self::InvalidRenderingIntent(intent) => {
                write!(f, "invalid rendering intent: {}", intent)
            }
            Self::CorruptedData(msg) => write!(f, "corrupted data: {}", msg),
        }
    }
}

impl std::error::Error for IccError {}
