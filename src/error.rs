//! Error types for the chart engine
//!
//! Data-quality problems (bad timestamps, non-numeric values, inverted ranges)
//! never surface here; they are skipped and reported through diagnostics.
//! Only caller contract violations and configuration problems are errors.

use thiserror::Error;

/// Main error type for the chart engine
#[derive(Error, Debug)]
pub enum Error {
    /// Granularity string is not one of hour, day, week, month
    #[error("Invalid granularity '{0}': expected one of hour, day, week, month")]
    InvalidGranularity(String),

    /// Resolved range would produce more buckets than the configured guard
    #[error("Bucket limit exceeded: {granularity} range would produce more than {limit} buckets")]
    BucketLimitExceeded {
        /// Granularity used for generation
        granularity: String,
        /// Configured maximum
        limit: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Validation errors
///
/// Raised while checking configuration values before an engine is built.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value is out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name being validated
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Required field is missing
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid format
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// Field name being validated
        field: String,
        /// Description of the format error
        message: String,
    },
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
