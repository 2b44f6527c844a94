//! OpenAI batch client implementation.
//!
//! This module provides an implementation of the `BatchApi` trait for
//! OpenAI's Files and Batches APIs.

use async_trait::async_trait;
use promptbatch_abstraction::{
    ApiError, BatchApi, BatchObject, CreateBatchRequest, FileObject, FilePurpose,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, error};

/// Default base URL for the OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// MIME type declared for uploaded batch artifacts.
const JSONL_MIME: &str = "application/jsonl";

/// OpenAI batch client.
#[derive(Debug, Clone)]
pub struct OpenAIBatchClient {
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the OpenAI API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAIBatchClient {
    /// Creates a new `OpenAIBatchClient` with a custom API key.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: DEFAULT_BASE_URL.to_string(), client: Client::new() }
    }

    /// Points the client at a different base URL (proxies, compatible services, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a prepared request and returns the successful response.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request.bearer_auth(&self.api_key).send().await.map_err(|e| {
            error!(error = %e, operation, "Failed to send request to OpenAI API");
            ApiError::RequestError(format!("Network error during {}: {}", operation, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %error_text,
                operation,
                "OpenAI API returned error status"
            );
            return Err(map_http_error(status, &error_text, operation));
        }

        Ok(response)
    }
}

#[async_trait]
impl BatchApi for OpenAIBatchClient {
    async fn upload_file(
        &self,
        file_name: &str,
        content: Vec<u8>,
        purpose: FilePurpose,
    ) -> Result<FileObject, ApiError> {
        debug!(file_name, size = content.len(), purpose = %purpose, "Uploading file to OpenAI");

        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(JSONL_MIME)
            .map_err(|e| ApiError::RequestError(format!("Failed to set MIME type: {}", e)))?;
        let form = Form::new().part("file", part).text("purpose", purpose.as_str());

        let url = format!("{}/files", self.base_url);
        let response = self.send(self.client.post(&url).multipart(form), "file upload").await?;

        let file: FileObject = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse upload response");
            ApiError::SerializationError(format!("Failed to parse upload response: {}", e))
        })?;

        debug!(file_id = %file.id, "File uploaded successfully");
        Ok(file)
    }

    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<BatchObject, ApiError> {
        debug!(
            input_file_id = %request.input_file_id,
            endpoint = %request.endpoint,
            completion_window = %request.completion_window,
            "Creating batch"
        );

        let url = format!("{}/batches", self.base_url);
        let response = self.send(self.client.post(&url).json(request), "batch creation").await?;

        let batch: BatchObject = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse batch creation response");
            ApiError::SerializationError(format!("Failed to parse batch response: {}", e))
        })?;

        debug!(batch_id = %batch.id, status = %batch.status, "Batch created");
        Ok(batch)
    }

    async fn retrieve_batch(&self, batch_id: &str) -> Result<BatchObject, ApiError> {
        debug!(batch_id, "Retrieving batch status");

        let url = format!("{}/batches/{}", self.base_url, batch_id);
        let operation = format!("retrieve batch {}", batch_id);
        let response = self.send(self.client.get(&url), &operation).await?;

        response.json().await.map_err(|e| {
            error!(error = %e, batch_id, "Failed to parse batch status response");
            ApiError::SerializationError(format!("Failed to parse batch response: {}", e))
        })
    }

    async fn file_content(&self, file_id: &str) -> Result<String, ApiError> {
        debug!(file_id, "Downloading file content");

        let url = format!("{}/files/{}/content", self.base_url, file_id);
        let operation = format!("download file {}", file_id);
        let response = self.send(self.client.get(&url), &operation).await?;

        let text = response.text().await.map_err(|e| {
            ApiError::RequestError(format!("Failed to read file content: {}", e))
        })?;

        debug!(file_id, size = text.len(), "File content downloaded");
        Ok(text)
    }

    fn provider_id(&self) -> &str {
        "openai"
    }
}

/// Maps HTTP status codes to appropriate ApiError variants.
fn map_http_error(status: StatusCode, error_text: &str, operation: &str) -> ApiError {
    match status.as_u16() {
        401 | 403 => ApiError::AuthenticationFailed(format!(
            "Authentication failed for {}: {}",
            operation, error_text
        )),
        404 => ApiError::NotFound(format!("Not found for {}: {}", operation, error_text)),
        402 | 429 => ApiError::QuotaExceeded {
            provider: "openai".to_string(),
            message: Some(format!("{}: {}", operation, error_text)),
        },
        _ => ApiError::ResponseError { status: status.as_u16(), body: error_text.to_string() },
    }
}
