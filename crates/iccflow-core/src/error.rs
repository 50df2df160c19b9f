//! Error types for iccflow

use thiserror::Error;

use crate::icc::{IccError, RenderingIntent, TagSignature};

/// Result type for iccflow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// This is what a [`Context`](crate::Context) error log receives alongside
/// the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    CorruptData,
    ChannelMismatch,
    UnknownTag,
    UnsupportedIntent,
    IncompatibleColorSpace,
    NotInvertible,
}

/// Errors that can occur in iccflow operations
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Bad constructor or call arguments
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed profile or tag bytes
    #[error("corrupt data: {0}")]
    CorruptData(String),

    /// A pipeline stage does not fit the channel chain
    #[error("channel mismatch: expected {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    /// A link or lookup referenced a tag the profile does not hold
    #[error("unknown tag '{0}'")]
    UnknownTag(TagSignature),

    /// No table for the requested intent and no fallback allowed
    #[error("rendering intent {0:?} is not supported")]
    UnsupportedIntent(RenderingIntent),

    /// Profiles and pixel formats cannot be reconciled
    #[error("incompatible color space: {0}")]
    IncompatibleColorSpace(String),

    /// The curve has no inverse
    #[error("not invertible: {0}")]
    NotInvertible(String),
}

impl Error {
    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::CorruptData(_) => ErrorKind::CorruptData,
            Self::ChannelMismatch { .. } => ErrorKind::ChannelMismatch,
            Self::UnknownTag(_) => ErrorKind::UnknownTag,
            Self::UnsupportedIntent(_) => ErrorKind::UnsupportedIntent,
            Self::IncompatibleColorSpace(_) => ErrorKind::IncompatibleColorSpace,
            Self::NotInvertible(_) => ErrorKind::NotInvertible,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptData(msg.into())
    }
}

impl From<IccError> for Error {
    fn from(err: IccError) -> Self {
        Self::CorruptData(err.to_string())
    }
}
