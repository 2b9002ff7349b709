//! Error types for placement engine operations.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use std::time::Duration;
use thiserror::Error;

/// Result alias used by every fallible engine operation.
pub type Result<T> = std::result::Result<T, HexmapError>;

/// Error type for every placement, projection, clustering and worker operation.
///
/// Variants follow the engine's error taxonomy:
/// - **Precondition**: `InsufficientItems`, `DimensionMismatch`, `InvalidInput`
/// - **Computation**: `ProjectionError`, `ProjectorUnavailable`, `ClusteringError`
/// - **Protocol/timeout**: `ProtocolError`, `Timeout`, `WorkerTerminated`
#[derive(Error, Debug)]
pub enum HexmapError {
    /// Projection invoked with fewer than two items
    #[error("Projection needs at least 2 items, got {0}")]
    InsufficientItems(usize),

    /// Embedding vectors do not share one dimensionality
    #[error("Dimension mismatch for item '{id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    /// Malformed request input (duplicate ids, non-finite values, bad bounds)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimensionality reduction failed
    #[error("Projection failed: {0}")]
    ProjectionError(String),

    /// No projector registered in the background context
    #[error("No projector registered: {0}")]
    ProjectorUnavailable(String),

    /// K-means / theme assignment failed
    #[error("Clustering failed: {0}")]
    ClusteringError(String),

    /// Malformed or unexpected worker message
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Background computation did not answer in time
    #[error("Placement timed out after {0:?}")]
    Timeout(Duration),

    /// Background context went away before replying
    #[error("Worker terminated: {0}")]
    WorkerTerminated(String),

    /// Error reported by the background context (wire `error` message)
    #[error("Worker error: {0}")]
    WorkerError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HexmapError {
    /// Create an invalid input error with context.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a projection error with context.
    pub fn projection(msg: impl Into<String>) -> Self {
        Self::ProjectionError(msg.into())
    }

    /// Create a clustering error with context.
    pub fn clustering(msg: impl Into<String>) -> Self {
        Self::ClusteringError(msg.into())
    }

    /// Create a protocol error with context.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Create a configuration error with context.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if error is recoverable.
    ///
    /// # Returns
    ///
    /// `true` if the request can be retried on a fresh background context,
    /// `false` if the same input would fail again
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::WorkerTerminated(_) | Self::IoError(_)
        )
    }
}
