//! Error types for earprint
//!
//! Every fallible stage of the pipeline reports through [`Error`]. Comparing
//! fingerprints of different kinds is not an error case here: the
//! [`Fingerprint`](crate::compare::Fingerprint) trait only accepts a second
//! fingerprint of the same type, so such a comparison does not compile.

use thiserror::Error;

/// Main error type for the analysis and comparison pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Signal is shorter than one output frame of the transform
    #[error("audio is too short: {duration_secs:.3}s, needs at least {minimum_secs:.3}s")]
    InputTooShort { duration_secs: f64, minimum_secs: f64 },

    /// Persisted fingerprint record is truncated or unparsable
    #[error("malformed fingerprint record at line {line} (expected {expected_lines} lines): {reason}")]
    MalformedRecord {
        line: usize,
        expected_lines: usize,
        reason: String,
    },

    /// Volume normalization did not reach its target within the iteration cap
    #[error("normalizer did not converge after {iterations} iterations (volume {volume:.4}, target {target:.4})")]
    NormalizerNonConvergence {
        iterations: usize,
        volume: f64,
        target: f64,
    },

    /// Audio container could not be decoded
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Only mono and stereo signals are analyzed
    #[error("unsupported channel count: {0} (only mono and stereo are supported)")]
    UnsupportedChannels(usize),

    /// Configuration file could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using earprint's Error
pub type Result<T> = std::result::Result<T, Error>;
