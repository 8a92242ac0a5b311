//! Error handling module for scenepull
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Library code returns these; the binary edge wraps them in `anyhow`.

use thiserror::Error;

/// Main error type for scenepull
#[derive(Error, Debug)]
pub enum PullError {
    /// IO errors (local CSV, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (loading, parsing)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (config values, user input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Region and footprint geometry errors
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Transport-level HTTP failures
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success responses from the platform
    #[error("Earth Engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Timestamp parsing errors
    #[error("Time error: {0}")]
    Time(String),

    /// A submitted export finished in a failed state
    #[error("Operation {name} failed: {message}")]
    Operation { name: String, message: String },
}

/// Result type alias for scenepull operations
pub type Result<T> = std::result::Result<T, PullError>;

// Convenient error constructors
impl PullError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a geometry error
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Create a time error
    pub fn time(msg: impl Into<String>) -> Self {
        Self::Time(msg.into())
    }

    /// Create an API error from a status code and message
    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }
}
