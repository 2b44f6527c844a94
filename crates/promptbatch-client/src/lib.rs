//! Batch service clients for promptbatch.
//!
//! This crate provides concrete implementations of the `BatchApi` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and dry runs (scripted statuses, echoed responses)
//! - **OpenAI**: OpenAI Files and Batches APIs (API key required)

pub mod openai;

use async_trait::async_trait;
use promptbatch_abstraction::{
    ApiError, BatchApi, BatchObject, BatchStatus, CreateBatchRequest, FileObject, FilePurpose,
    RequestCounts,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

pub use openai::OpenAIBatchClient;

/// Identifier of the output artifact produced by `MockBatchApi`.
pub const MOCK_OUTPUT_FILE_ID: &str = "file-mock-output";

/// A mock implementation of the `BatchApi` trait for testing and dry runs.
///
/// Status queries replay a scripted sequence; once the script is exhausted the
/// last status is repeated. Unless an explicit output artifact is configured,
/// the output echoes every uploaded request back as a completion.
#[derive(Debug, Default)]
pub struct MockBatchApi {
    script: Mutex<VecDeque<Result<BatchStatus, ApiError>>>,
    last_status: Mutex<Option<BatchStatus>>,
    output: Option<String>,
    upload_error: Option<ApiError>,
    create_error: Option<ApiError>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
    batches: Mutex<Vec<CreateBatchRequest>>,
    status_calls: AtomicUsize,
    content_calls: AtomicUsize,
}

impl MockBatchApi {
    /// Creates a mock whose batches complete on the first status query.
    #[must_use]
    pub fn new() -> Self {
        Self::default().with_statuses([BatchStatus::Completed])
    }

    /// Replaces the scripted status sequence.
    #[must_use]
    pub fn with_statuses(self, statuses: impl IntoIterator<Item = BatchStatus>) -> Self {
        let script = statuses.into_iter().map(Ok).collect();
        Self { script: Mutex::new(script), ..self }
    }

    /// Appends a failing status query to the script.
    #[must_use]
    pub fn then_status_error(mut self, error: ApiError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    /// Appends a status to the script.
    #[must_use]
    pub fn then_status(mut self, status: BatchStatus) -> Self {
        self.script.get_mut().push_back(Ok(status));
        self
    }

    /// Serves `content` as the output artifact instead of echoing the input.
    #[must_use]
    pub fn with_output(mut self, content: impl Into<String>) -> Self {
        self.output = Some(content.into());
        self
    }

    /// Makes every upload fail with `error`.
    #[must_use]
    pub fn failing_upload(mut self, error: ApiError) -> Self {
        self.upload_error = Some(error);
        self
    }

    /// Makes every batch creation fail with `error`.
    #[must_use]
    pub fn failing_create(mut self, error: ApiError) -> Self {
        self.create_error = Some(error);
        self
    }

    /// Returns every uploaded file as `(file name, content)`.
    pub async fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.uploads.lock().await.clone()
    }

    /// Returns every batch creation request received.
    pub async fn created_batches(&self) -> Vec<CreateBatchRequest> {
        self.batches.lock().await.clone()
    }

    /// Number of status queries served.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Number of artifact downloads served.
    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }

    fn batch(id: String, status: BatchStatus, input_file_id: Option<String>) -> BatchObject {
        BatchObject {
            id,
            status,
            endpoint: Some(promptbatch_abstraction::DEFAULT_ENDPOINT.to_string()),
            input_file_id,
            completion_window: Some(promptbatch_abstraction::DEFAULT_COMPLETION_WINDOW.to_string()),
            output_file_id: (status == BatchStatus::Completed)
                .then(|| MOCK_OUTPUT_FILE_ID.to_string()),
            error_file_id: None,
            created_at: None,
            request_counts: None,
        }
    }

    /// Builds an output artifact answering every uploaded request.
    async fn echo_output(&self) -> String {
        let uploads = self.uploads.lock().await;
        let Some((_, content)) = uploads.last() else {
            return String::new();
        };

        String::from_utf8_lossy(content)
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .map(|request| {
                let prompt = request["body"]["messages"]
                    .as_array()
                    .and_then(|messages| messages.last())
                    .and_then(|message| message["content"].as_str())
                    .unwrap_or_default();
                json!({
                    "custom_id": request["custom_id"],
                    "response": {
                        "status_code": 200,
                        "body": {
                            "choices": [{
                                "message": {
                                    "role": "assistant",
                                    "content": format!("Mock response for: {prompt}"),
                                }
                            }]
                        }
                    }
                })
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl BatchApi for MockBatchApi {
    async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
        purpose: FilePurpose,
    ) -> Result<FileObject, ApiError> {
        debug!(file_name, size = content.len(), purpose = %purpose, "MockBatchApi upload");

        if let Some(err) = &self.upload_error {
            return Err(err.clone());
        }

        let bytes = content.len() as u64;
        let mut uploads = self.uploads.lock().await;
        uploads.push((file_name.to_string(), content));

        Ok(FileObject {
            id: format!("file-mock-input-{}", uploads.len()),
            bytes: Some(bytes),
            created_at: None,
            filename: Some(file_name.to_string()),
            purpose: Some(purpose.as_str().to_string()),
        })
    }

    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<BatchObject, ApiError> {
        debug!(input_file_id = %request.input_file_id, "MockBatchApi create batch");

        if let Some(err) = &self.create_error {
            return Err(err.clone());
        }

        let mut batches = self.batches.lock().await;
        batches.push(request.clone());

        Ok(Self::batch(
            format!("batch_mock_{}", batches.len()),
            BatchStatus::Validating,
            Some(request.input_file_id.clone()),
        ))
    }

    async fn retrieve_batch(&self, batch_id: &str) -> Result<BatchObject, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().await.pop_front();
        let mut last = self.last_status.lock().await;
        let status = match next {
            Some(Ok(status)) => status,
            Some(Err(err)) => return Err(err),
            None => last.unwrap_or(BatchStatus::Validating),
        };
        *last = Some(status);

        debug!(batch_id, status = %status, "MockBatchApi status");

        let mut batch = Self::batch(batch_id.to_string(), status, None);
        let total = self.uploads.lock().await.last().map_or(0, |(_, c)| {
            String::from_utf8_lossy(c).lines().filter(|l| !l.trim().is_empty()).count() as u32
        });
        let completed = if status == BatchStatus::Completed { total } else { 0 };
        batch.request_counts = Some(RequestCounts { total, completed, failed: 0 });
        Ok(batch)
    }

    async fn file_content(&self, file_id: &str) -> Result<String, ApiError> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);

        if file_id != MOCK_OUTPUT_FILE_ID {
            return Err(ApiError::NotFound(format!("No such file: {}", file_id)));
        }

        match &self.output {
            Some(output) => Ok(output.clone()),
            None => Ok(self.echo_output().await),
        }
    }

    fn provider_id(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script_then_repeats_last() {
        let api = MockBatchApi::default()
            .with_statuses([BatchStatus::Validating, BatchStatus::InProgress])
            .then_status(BatchStatus::Completed);

        assert_eq!(api.retrieve_batch("b").await.unwrap().status, BatchStatus::Validating);
        assert_eq!(api.retrieve_batch("b").await.unwrap().status, BatchStatus::InProgress);

        let done = api.retrieve_batch("b").await.unwrap();
        assert_eq!(done.status, BatchStatus::Completed);
        assert_eq!(done.output_file_id.as_deref(), Some(MOCK_OUTPUT_FILE_ID));

        assert_eq!(api.retrieve_batch("b").await.unwrap().status, BatchStatus::Completed);
        assert_eq!(api.status_calls(), 4);
    }

    #[tokio::test]
    async fn test_mock_status_error() {
        let api = MockBatchApi::default()
            .then_status_error(ApiError::RequestError("offline".to_string()))
            .then_status(BatchStatus::Completed);

        assert!(api.retrieve_batch("b").await.is_err());
        assert_eq!(api.retrieve_batch("b").await.unwrap().status, BatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_mock_echoes_uploaded_requests() {
        let api = MockBatchApi::new();
        let line = r#"{"custom_id":"request-1","method":"POST","url":"/v1/chat/completions","body":{"model":"m","messages":[{"role":"system","content":"s"},{"role":"user","content":"hello"}]}}"#;
        api.upload_file("batch_input.jsonl", line.as_bytes().to_vec(), FilePurpose::Batch)
            .await
            .unwrap();

        let output = api.file_content(MOCK_OUTPUT_FILE_ID).await.unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["custom_id"], "request-1");
        assert_eq!(
            value["response"]["body"]["choices"][0]["message"]["content"],
            "Mock response for: hello"
        );
    }

    #[tokio::test]
    async fn test_mock_failing_upload() {
        let api = MockBatchApi::new().failing_upload(ApiError::RequestError("nope".to_string()));
        let result = api.upload_file("f", Vec::new(), FilePurpose::Batch).await;
        assert!(result.is_err());
        assert!(api.uploads().await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_unknown_file() {
        let api = MockBatchApi::new();
        let result = api.file_content("file-other").await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
