//! Core error types for watchlist-core.
//!
//! Foreground operations return [`CoreError`]; background countdown expiries
//! never surface errors and only log them.

use std::path::PathBuf;
use thiserror::Error;

use crate::entity::EntityId;

/// Core error type for watchlist-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input rejected before any collaborator call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The persistence collaborator failed; the store was left unchanged
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Foreground operation referenced an id absent from the store
    #[error("Entity {id} not found")]
    NotFound { id: EntityId },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(id: EntityId) -> Self {
        CoreError::NotFound { id }
    }
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Goal text was empty or whitespace only
    #[error("goal must not be empty")]
    EmptyGoal,

    /// Entity name was empty or whitespace only
    #[error("name must not be empty")]
    EmptyName,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failures reported by a persistence collaborator.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Collaborator answered with a non-success status
    #[error("collaborator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Collaborator refused the request
    #[error("{0}")]
    Rejected(String),

    /// Endpoint URL could not be built
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home or config directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
