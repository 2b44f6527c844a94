//! Batch submission: upload the request artifact, then register the job.

use crate::batch::encoder::to_jsonl;
use crate::batch::error::{BatchError, Result};
use crate::batch::types::EncodedRequest;
use promptbatch_abstraction::{
    BatchApi, BatchObject, CreateBatchRequest, DEFAULT_COMPLETION_WINDOW, DEFAULT_ENDPOINT,
    FilePurpose,
};
use tracing::{debug, info};

/// File name the request artifact is uploaded under.
pub const INPUT_FILE_NAME: &str = "batch_input.jsonl";

/// Options declared when registering a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Endpoint declared for the batch.
    pub endpoint: String,
    /// Completion window declared for the batch.
    pub completion_window: String,
    /// File name for the uploaded artifact.
    pub input_file_name: String,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            completion_window: DEFAULT_COMPLETION_WINDOW.to_string(),
            input_file_name: INPUT_FILE_NAME.to_string(),
        }
    }
}

/// Uploads `requests` as a line-delimited artifact and registers a batch for it.
///
/// # Errors
/// - `InvalidInput` if there are no requests
/// - `UploadError` if the service rejects the artifact
/// - `BatchCreateError` if the service rejects the batch
pub async fn submit(
    api: &dyn BatchApi,
    requests: &[EncodedRequest],
    options: &SubmitOptions,
) -> Result<BatchObject> {
    if requests.is_empty() {
        return Err(BatchError::InvalidInput("no requests to submit".to_string()));
    }

    let artifact = to_jsonl(requests)?;
    debug!(
        provider = api.provider_id(),
        requests = requests.len(),
        bytes = artifact.len(),
        "Uploading batch input"
    );

    let file = api
        .upload_file(&options.input_file_name, artifact.into_bytes(), FilePurpose::Batch)
        .await
        .map_err(BatchError::UploadError)?;

    let request = CreateBatchRequest {
        input_file_id: file.id.clone(),
        endpoint: options.endpoint.clone(),
        completion_window: options.completion_window.clone(),
    };

    let batch = api.create_batch(&request).await.map_err(BatchError::BatchCreateError)?;

    info!(
        batch_id = %batch.id,
        input_file_id = %file.id,
        status = %batch.status,
        requests = requests.len(),
        "Batch submitted"
    );

    Ok(batch)
}
