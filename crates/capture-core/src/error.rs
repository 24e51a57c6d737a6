use std::time::Duration;

use thiserror::Error;

/// Core error type for progressive-capture operations.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The governor refused to admit the call; retry after the given delay.
    #[error("Rate limit exhausted: retry after {retry_after:?}")]
    RateExhausted {
        retry_after: Duration,
        limit: u32,
        remaining: u32,
    },

    /// Networking error talking to the forge (timeout, connection reset, DNS, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unique-key violation on an upsert; callers treat this as success.
    #[error("Store conflict: {0}")]
    StoreConflict(String),

    /// Any store failure other than a conflict.
    #[error("Store error: {0}")]
    StoreError(String),

    /// The caller is excluded by the Rollout Controller and no fallback path exists.
    #[error("Rollout gated: {0}")]
    RolloutGated(String),

    /// `update` rejected because `emergency_stop = true` on the current configuration.
    #[error("Emergency stopped: {0}")]
    EmergencyStopped(String),

    /// The chosen back-end refused dispatch and the alternate back-end also refused.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<serde_json::Error> for CaptureError {
    fn from(e: serde_json::Error) -> Self {
        CaptureError::Serialization(e.to_string())
    }
}

/// Result type alias using CaptureError.
pub type Result<T> = std::result::Result<T, CaptureError>;
