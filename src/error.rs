//! Error types for costdash
//!
//! Library code uses `crate::error::Result<T>` which returns `CostdashError`.
//! The CLI uses `anyhow::Result<T>` and converts at the boundary, mapping the
//! error back to an exit code through `crate::exit_codes`.
//!
//! ## Error kinds
//!
//! - `NotFound`: the requested object (bucket or key) does not exist
//! - `Access`: the caller is authenticated but not allowed to perform the call
//! - `Parse`: a response body or document could not be interpreted
//! - `InvalidRange`: a billing date range with `start >= end`
//! - `Transient`: network failures, timeouts, throttling, 5xx responses
//! - `Auth`: missing, expired or invalid credentials
//!
//! None of the fetch or estimation components recover from these. A failure
//! always reaches the caller as one of these values and never as an empty or
//! zero-valued result standing in for missing data.
//!
//! ## Retry awareness
//!
//! `IsRetryable` tells the caller whether an automatic retry makes sense.
//! Only `Transient` is retryable; `Auth` in particular must not be retried
//! automatically.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for costdash
#[derive(Error, Debug)]
pub enum CostdashError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not found: {resource} ({operation})")]
    NotFound { operation: String, resource: String },

    #[error("Access denied: {operation} - {message}")]
    Access { operation: String, message: String },

    #[error("Parse error: {context} - {message}")]
    Parse { context: String, message: String },

    #[error("Invalid date range: start {start} must be before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Transient error: {operation} - {message}")]
    Transient { operation: String, message: String },

    #[error("Authentication error: {operation} - {message}")]
    Auth { operation: String, message: String },

    #[error("AWS SDK error: {operation} - {message}")]
    Aws { operation: String, message: String },

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CostdashError>;

impl CostdashError {
    pub fn parse(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        CostdashError::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CostdashError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Trait for determining if an error is worth retrying
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for CostdashError {
    fn is_retryable(&self) -> bool {
        matches!(self, CostdashError::Transient { .. })
    }
}
