//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Errors raised while decoding a wire payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A segment that the reader expects was never written.
    #[error("Malformed payload: missing <{tag}> segment")]
    MissingField { tag: String },

    /// An opening tag was found without its closing tag.
    #[error("Malformed payload: <{tag}> segment is not terminated")]
    Unterminated { tag: String },

    /// A segment contains an escape sequence the writer never produces.
    #[error("Malformed payload: invalid escape in <{tag}> segment")]
    InvalidEscape { tag: String },

    /// A segment value cannot be interpreted (e.g. unknown status filter).
    #[error("Malformed payload: invalid value {value:?} for <{tag}>")]
    InvalidValue { tag: String, value: String },
}

impl CodecError {
    /// The tag of the segment that failed to decode.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::MissingField { tag }
            | Self::Unterminated { tag }
            | Self::InvalidEscape { tag }
            | Self::InvalidValue { tag, .. } => tag,
        }
    }
}
