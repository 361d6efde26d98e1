//! Error types for branch-fetch
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Failures reported by an invoker are carried as [`InvokeError`] and
//! classified by [`InvokeError::kind`]; the fetch loop turns them into the
//! terminal variants below once retrying is no longer possible.

use crate::invoker::InvokeError;
use thiserror::Error;

/// The main error type for branch-fetch
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Invalid request argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Invocation Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Not found: {message}")]
    NotFound { message: String },

    // ============================================================================
    // Fetch Errors
    // ============================================================================
    #[error("Max retries ({attempts}) exceeded: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: InvokeError,
    },

    #[error("Fetch cancelled")]
    Cancelled,

    // ============================================================================
    // Partition Errors
    // ============================================================================
    #[error("Partition error for '{partition}': {message}")]
    Partition { partition: String, message: String },

    #[error("Partition '{partition}' panicked: {message}")]
    PartitionPanicked { partition: String, message: String },

    #[error("Duplicate partition id: {id}")]
    DuplicatePartition { id: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a partition error
    pub fn partition(partition: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Partition {
            partition: partition.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for branch-fetch
pub type Result<T> = std::result::Result<T, Error>;
