//! Error types for the batch lifecycle.

use promptbatch_abstraction::{ApiError, BatchStatus};
use thiserror::Error;

/// Errors that can occur while running a batch job.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The prompt file could not be read or decoded.
    #[error("Failed to read input {path}: {reason}")]
    ReadError {
        /// Path (or label) of the input.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// The input is readable but cannot be submitted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The service rejected the artifact upload.
    #[error("File upload failed: {0}")]
    UploadError(#[source] ApiError),

    /// The service rejected the batch registration.
    #[error("Batch creation failed: {0}")]
    BatchCreateError(#[source] ApiError),

    /// Querying the batch status failed (not a job failure).
    #[error("Status query for batch {batch_id} failed: {source}")]
    StatusFetchError {
        /// Batch being polled.
        batch_id: String,
        /// Last transport error.
        #[source]
        source: ApiError,
    },

    /// The output artifact could not be obtained.
    #[error("Failed to fetch results for batch {batch_id}: {reason}")]
    ResultFetchError {
        /// Batch whose output was requested.
        batch_id: String,
        /// What went wrong.
        reason: String,
    },

    /// A line of the output artifact is not valid JSON.
    #[error("Malformed output on line {line}: {source}")]
    ParseError {
        /// 1-based line number in the artifact.
        line: usize,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The batch reached a terminal state without output.
    #[error("Batch {batch_id} ended with status {status}")]
    JobFailed {
        /// Batch that failed.
        batch_id: String,
        /// Terminal status reported by the service.
        status: BatchStatus,
    },

    /// Polling was cancelled before the batch finished.
    #[error("Polling batch {batch_id} was cancelled")]
    Cancelled {
        /// Batch being polled.
        batch_id: String,
    },

    /// The attempt cap was reached before the batch finished.
    #[error("Batch {batch_id} still not finished after {attempts} status checks")]
    MaxAttemptsExceeded {
        /// Batch being polled.
        batch_id: String,
        /// Status queries issued.
        attempts: u32,
    },

    /// Requests could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The result table could not be rendered.
    #[error("Export error: {0}")]
    ExportError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;
