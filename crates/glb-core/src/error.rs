//! Error taxonomy for container parsing and accessor decoding.
//!
//! Every failure in the engine is one of a small set of kinds so callers can
//! decide how far it propagates: a malformed container ends the whole
//! session, while a bad accessor only takes down the attribute (or primitive)
//! that referenced it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Malformed GLB container: bad magic/version, truncated or duplicate chunks.
    #[error("Invalid container: {0}")]
    Format(String),
    /// An accessor, buffer view or sparse window exceeds its backing storage.
    #[error("Out of bounds: {0}")]
    Bounds(String),
    /// No converter exists for the requested combination.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Decoded data violates a structural invariant.
    #[error("Structural error: {0}")]
    Structural(String),
    /// An index into one of the document arrays does not exist.
    #[error("Invalid {kind} reference: {index}")]
    InvalidReference { kind: &'static str, index: usize },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

impl DecodeError {
    /// Returns true if the error invalidates the whole decode session rather
    /// than a single accessor.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, DecodeError::Format(_))
    }

    pub fn format(msg: impl Into<String>) -> Self {
        DecodeError::Format(msg.into())
    }

    pub fn bounds(msg: impl Into<String>) -> Self {
        DecodeError::Bounds(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        DecodeError::UnsupportedFormat(msg.into())
    }

    pub fn structural(msg: impl Into<String>) -> Self {
        DecodeError::Structural(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_format_errors_are_session_fatal() {
        assert!(DecodeError::format("bad magic").is_session_fatal());
        assert!(!DecodeError::bounds("past end").is_session_fatal());
        assert!(!DecodeError::unsupported("MAT3 position").is_session_fatal());
        assert!(!DecodeError::structural("7 indices").is_session_fatal());
        assert!(!DecodeError::InvalidReference { kind: "accessor", index: 3 }.is_session_fatal());
    }

    #[test]
    fn test_display() {
        let err = DecodeError::InvalidReference { kind: "bufferView", index: 4 };
        assert_eq!(err.to_string(), "Invalid bufferView reference: 4");
        assert_eq!(
            DecodeError::format("no JSON chunk").to_string(),
            "Invalid container: no JSON chunk"
        );
    }
}
