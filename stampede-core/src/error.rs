//! Error types for stampede operations

use thiserror::Error;

/// Remote key-value store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection failed: {reason}")]
    Connection { reason: String },

    #[error("Command {command} failed for {key}: {reason}")]
    Command {
        command: String,
        key: String,
        reason: String,
    },

    #[error("Serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },
}

impl StoreError {
    /// Build a command error from any displayable cause.
    pub fn command(command: &str, key: &str, cause: impl std::fmt::Display) -> Self {
        StoreError::Command {
            command: command.to_string(),
            key: key.to_string(),
            reason: cause.to_string(),
        }
    }
}

/// Origin loader failure.
///
/// The only error kind that surfaces to `get_or_load` callers: everything
/// else in the engine is fail-open. A not-found loader result is a value
/// (`None`), not an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Origin load failed: {reason}")]
pub struct OriginError {
    pub reason: String,
}

impl OriginError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Master error type for cache-strategy operations.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),
}

/// Result type alias for cache-strategy operations.
pub type CacheResult<T> = Result<T, CacheError>;
