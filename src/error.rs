//! Error types for personae.
//!
//! Load-time failures are strongly typed using thiserror so the binary can
//! report them precisely. Per-record data problems are not errors: they are
//! skipped, counted and surfaced through the run summary.

use std::path::PathBuf;

use thiserror::Error;

/// Validation errors for configuration values and individual input records.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Threshold '{field}' is {value}, expected a value in [0, 100]")]
    ThresholdOutOfRange {
        field: &'static str,
        value: f64,
    },

    #[error("Setting '{field}' must be at least {minimum} (got {actual})")]
    InvalidMinimum {
        field: &'static str,
        minimum: usize,
        actual: usize,
    },

    #[error("Malformed record '{raw_name}': {reason}")]
    MalformedRecord {
        raw_name: String,
        reason: String,
    },

    #[error("Malformed trial '{trial_id}': {reason}")]
    MalformedTrial {
        trial_id: String,
        reason: String,
    },
}

/// Errors raised while loading the input tables.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Required input file is missing: {}", path.display())]
    MissingInputFile {
        path: PathBuf,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported layout in {}: {reason}", path.display())]
    UnsupportedShape {
        path: PathBuf,
        reason: String,
    },
}

/// Errors raised while writing the output artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {artifact} as CSV: {source}")]
    Csv {
        artifact: &'static str,
        #[source]
        source: csv::Error,
    },
}

/// Top-level error type for personae.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Configuration error in {}: {message}", path.display())]
    Config {
        path: PathBuf,
        message: String,
    },
}

impl ResolveError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an input error.
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// Returns true if this is an output error.
    #[must_use]
    pub const fn is_output(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    /// Returns true if a required input file was absent.
    #[must_use]
    pub const fn is_missing_input(&self) -> bool {
        matches!(self, Self::Input(InputError::MissingInputFile { .. }))
    }
}

/// Result type alias for personae operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
