//! Error types for churn analysis operations.
//!
//! Only genuine failures are represented here. A shipper with no history, a
//! single event, or an unknown tenure anchor is a normal state that the
//! cadence estimator, scorer and lifecycle engine handle with `Option` values
//! and fixed fallbacks, never with an error.
//!
//! # Categories
//!
//! - `Storage`: the storage collaborator failed (possibly transiently)
//! - `ShipperNotFound`: a shipper id did not resolve to a record
//! - `InvalidInput`: malformed data rejected at the boundary
//! - `Configuration`: configuration file or value problems
//!
//! # Example
//!
//! ```rust
//! use churnmap::errors::ChurnError;
//!
//! let err = ChurnError::storage("connection reset", true);
//! assert!(err.is_retryable());
//!
//! let err = ChurnError::invalid_input("events out of order");
//! assert!(!err.is_retryable());
//! ```

use crate::core::ShipperId;
use thiserror::Error;

/// Main error type for churnmap operations
#[derive(Debug, Error)]
pub enum ChurnError {
    /// Storage collaborator failures
    #[error("Storage error: {message}")]
    Storage { message: String, retryable: bool },

    /// A shipper id did not match any stored record
    #[error("Shipper {0} not found")]
    ShipperNotFound(ShipperId),

    /// Malformed input rejected before reaching the scoring functions
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl ChurnError {
    /// Create a storage error.
    pub fn storage(message: impl Into<String>, retryable: bool) -> Self {
        Self::Storage {
            message: message.into(),
            retryable,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether retrying the same operation may succeed.
    ///
    /// Storage failures carry their own flag; raw I/O failures are always
    /// treated as transient. Input and configuration problems never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage { retryable, .. } => *retryable,
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Short category name for structured logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Storage { .. } => "storage",
            Self::ShipperNotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Configuration(_) => "configuration",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Toml(_) => "toml",
        }
    }
}

/// Result type alias for churnmap operations
pub type Result<T> = std::result::Result<T, ChurnError>;
