//! Batch service abstraction layer for promptbatch.
//!
//! This module defines the core trait and wire types for talking to a remote
//! batch completion service: uploading input artifacts, registering batch
//! jobs, querying their status and downloading their output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Endpoint every encoded request targets, and the endpoint declared on batch creation.
pub const DEFAULT_ENDPOINT: &str = "/v1/chat/completions";

/// Completion window declared on batch creation.
pub const DEFAULT_COMPLETION_WINDOW: &str = "24h";

/// Represents an error that can occur when talking to the batch service.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiError {
    /// The request could not be sent or completed (network issues, invalid request).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The credential was missing or rejected.
    #[error("Authentication Failed: {0}")]
    AuthenticationFailed(String),

    /// The referenced file or batch does not exist.
    #[error("Not Found: {0}")]
    NotFound(String),

    /// Provider quota exceeded or rate limit hit.
    #[error("Provider '{provider}' quota exceeded{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    QuotaExceeded {
        /// The provider name (e.g., "openai").
        provider: String,
        /// Optional error message from the provider.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The service answered with a non-success status.
    #[error("Response Error ({status}): {body}")]
    ResponseError {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),
}

/// Declared purpose of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePurpose {
    /// Line-delimited batch input.
    Batch,
    /// Output produced by a batch.
    BatchOutput,
}

impl FilePurpose {
    /// Returns the wire value for this purpose.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::BatchOutput => "batch_output",
        }
    }
}

impl fmt::Display for FilePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file stored by the batch service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    /// File identifier (e.g., "file-abc123").
    pub id: String,
    /// Size of the file in bytes.
    #[serde(default)]
    pub bytes: Option<u64>,
    /// Unix timestamp of creation.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Name the file was uploaded with.
    #[serde(default)]
    pub filename: Option<String>,
    /// Declared purpose.
    #[serde(default)]
    pub purpose: Option<String>,
}

/// Lifecycle status of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Input file is being validated.
    Validating,
    /// Input validation failed.
    Failed,
    /// Requests are being processed.
    InProgress,
    /// Results are being prepared.
    Finalizing,
    /// Finished; results are available.
    Completed,
    /// Not finished within the completion window.
    Expired,
    /// Cancellation was requested.
    Cancelling,
    /// Cancelled before completion.
    Cancelled,
    /// A status value this client does not know about.
    #[serde(other)]
    Unknown,
}

impl BatchStatus {
    /// Whether polling should stop at this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired | Self::Cancelled)
    }

    /// Whether this status ends the job without usable output.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Expired | Self::Cancelled)
    }

    /// Returns the wire value for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Failed => "failed",
            Self::InProgress => "in_progress",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request progress counters reported for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    /// Number of requests in the batch.
    #[serde(default)]
    pub total: u32,
    /// Number of requests that finished successfully.
    #[serde(default)]
    pub completed: u32,
    /// Number of requests that failed.
    #[serde(default)]
    pub failed: u32,
}

/// A batch job as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchObject {
    /// Batch identifier (e.g., "batch_abc123").
    pub id: String,
    /// Current status.
    pub status: BatchStatus,
    /// Endpoint the batch targets.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Uploaded input file.
    #[serde(default)]
    pub input_file_id: Option<String>,
    /// Declared completion window.
    #[serde(default)]
    pub completion_window: Option<String>,
    /// Output artifact, present once the batch has completed.
    #[serde(default)]
    pub output_file_id: Option<String>,
    /// Artifact with per-request errors, if any.
    #[serde(default)]
    pub error_file_id: Option<String>,
    /// Unix timestamp of creation.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Progress counters.
    #[serde(default)]
    pub request_counts: Option<RequestCounts>,
}

/// Body of a batch creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    /// Identifier of the uploaded input artifact.
    pub input_file_id: String,
    /// Endpoint every request in the batch targets.
    pub endpoint: String,
    /// Maximum duration the service may take.
    pub completion_window: String,
}

impl CreateBatchRequest {
    /// Creates a request for the default endpoint and completion window.
    #[must_use]
    pub fn new(input_file_id: impl Into<String>) -> Self {
        Self {
            input_file_id: input_file_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            completion_window: DEFAULT_COMPLETION_WINDOW.to_string(),
        }
    }
}

/// A trait for interacting with a remote batch completion service.
///
/// Implementations must be `Send + Sync` so a single client can be shared
/// across tasks.
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Uploads an artifact and returns the stored file.
    ///
    /// # Errors
    /// Returns an `ApiError` if the service rejects the upload.
    async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
        purpose: FilePurpose,
    ) -> Result<FileObject, ApiError>;

    /// Registers a new batch job.
    ///
    /// # Errors
    /// Returns an `ApiError` if the service rejects the batch.
    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<BatchObject, ApiError>;

    /// Fetches the current state of a batch job.
    ///
    /// # Errors
    /// Returns an `ApiError` if the status query fails.
    async fn retrieve_batch(&self, batch_id: &str) -> Result<BatchObject, ApiError>;

    /// Downloads the raw content of a stored file.
    ///
    /// # Errors
    /// Returns an `ApiError` if the download fails.
    async fn file_content(&self, file_id: &str) -> Result<String, ApiError>;

    /// Returns a short name for the provider behind this client.
    fn provider_id(&self) -> &str;
}
