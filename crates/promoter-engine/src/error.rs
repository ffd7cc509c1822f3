//! Error types for promoter-engine

use thiserror::Error;

/// Result type alias using promoter-engine's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// Consistency or configuration error raised before execution
    #[error(transparent)]
    Core(#[from] promoter_core::Error),

    /// One or more requests failed during execution
    #[error("{failed} of {total} promotion requests failed")]
    ExecutionFailed { failed: usize, total: usize },

    /// The run was cancelled before some requests were picked up
    #[error("{count} promotion requests were not attempted")]
    NotAttempted { count: usize },

    /// A worker task panicked or was aborted
    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
