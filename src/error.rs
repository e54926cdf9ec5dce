//! Error types for the Civicpulse feedback service
//!
//! This module provides error handling using thiserror for structured error
//! definitions and anyhow for error propagation at the binary edge.

use thiserror::Error;

/// Main error type for Civicpulse operations
#[derive(Error, Debug)]
pub enum CivicpulseError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Submission rejected before persistence (missing required field, etc.)
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Batch not found
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// Batch status transition rejected (already advanced or never existed)
    #[error("Invalid batch transition: {0}")]
    InvalidTransition(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Civicpulse operations
pub type Result<T> = std::result::Result<T, CivicpulseError>;

impl From<libsql::Error> for CivicpulseError {
    fn from(err: libsql::Error) -> Self {
        CivicpulseError::Database(err.to_string())
    }
}

/// Convert anyhow::Error to CivicpulseError
impl From<anyhow::Error> for CivicpulseError {
    fn from(err: anyhow::Error) -> Self {
        CivicpulseError::Other(err.to_string())
    }
}
