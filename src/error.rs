//! Error types for wearable-metrics

use crate::types::SourceId;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, WearableError>;

/// Errors raised by adapters, the provider and the overview loader
#[derive(Debug, Error)]
pub enum WearableError {
    #[error("{source_id} query failed: {message}")]
    Query { source_id: SourceId, message: String },

    #[error("{0} adapter is not connected")]
    NotConnected(SourceId),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to parse vendor export: {0}")]
    Parse(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WearableError {
    /// Shorthand for a query failure attributed to a source
    pub fn query(source_id: SourceId, message: impl Into<String>) -> Self {
        WearableError::Query {
            source_id,
            message: message.into(),
        }
    }
}
