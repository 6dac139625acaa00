//! Error types for engram-core.

use thiserror::Error;

/// Result type alias using engram-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing Engram data.
#[derive(Error, Debug)]
pub enum Error {
    /// The first six bytes are missing or are not `ENGRAM`
    #[error("invalid magic bytes: not an Engram file")]
    InvalidMagic,

    /// The payload digest does not match the one stored in the header
    #[error("integrity check failed: expected {expected}, computed {actual}")]
    IntegrityFailed { expected: String, actual: String },

    /// Malformed MessagePack structure in the header or payload
    #[error("failed to decode {context}: {source}")]
    Decoding {
        context: &'static str,
        #[source]
        source: rmp_serde::decode::Error,
    },

    /// Serialization of the header or payload failed
    #[error("failed to encode {context}: {source}")]
    Encoding {
        context: &'static str,
        #[source]
        source: rmp_serde::encode::Error,
    },

    /// A timestamp value could not be interpreted
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Underlying byte source or sink failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a decoding error for the given section.
    pub fn decoding(context: &'static str, source: rmp_serde::decode::Error) -> Self {
        Self::Decoding { context, source }
    }

    /// Create an encoding error for the given section.
    pub fn encoding(context: &'static str, source: rmp_serde::encode::Error) -> Self {
        Self::Encoding { context, source }
    }

    /// Create an integrity failure from the stored and recomputed digests.
    pub fn integrity_failed(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IntegrityFailed {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether this error is a payload digest mismatch.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::IntegrityFailed { .. })
    }

    /// Whether this error means the data is not an Engram file at all.
    pub fn is_invalid_magic(&self) -> bool {
        matches!(self, Self::InvalidMagic)
    }
}
