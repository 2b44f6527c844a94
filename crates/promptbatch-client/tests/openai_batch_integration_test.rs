//! Integration tests for the OpenAI batch client against a mock HTTP server.

use mockito::Matcher;
use promptbatch_abstraction::{ApiError, BatchApi, BatchStatus, CreateBatchRequest, FilePurpose};
use promptbatch_client::OpenAIBatchClient;

fn client_for(server: &mockito::ServerGuard) -> OpenAIBatchClient {
    OpenAIBatchClient::with_api_key("test-key").with_base_url(format!("{}/v1", server.url()))
}

#[tokio::test]
async fn test_upload_file_sends_multipart_with_purpose() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/files")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="purpose""#.to_string()),
            Matcher::Regex(r#"filename="batch_input.jsonl""#.to_string()),
            Matcher::Regex(r#"\{"custom_id":"request-1"\}"#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "file-abc", "object": "file", "bytes": 25, "purpose": "batch"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let file = client
        .upload_file(
            "batch_input.jsonl",
            br#"{"custom_id":"request-1"}"#.to_vec(),
            FilePurpose::Batch,
        )
        .await
        .unwrap();

    assert_eq!(file.id, "file-abc");
    assert_eq!(file.purpose.as_deref(), Some("batch"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upload_file_rejected() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/files")
        .with_status(400)
        .with_body(r#"{"error": {"message": "Invalid file format"}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.upload_file("batch_input.jsonl", b"x".to_vec(), FilePurpose::Batch).await;

    match result {
        Err(ApiError::ResponseError { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Invalid file format"));
        }
        other => panic!("Expected ResponseError, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_batch_sends_json_body() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/batches")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Json(serde_json::json!({
            "input_file_id": "file-abc",
            "endpoint": "/v1/chat/completions",
            "completion_window": "24h"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id": "batch_123", "object": "batch", "status": "validating",
                "input_file_id": "file-abc", "output_file_id": null}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let batch = client.create_batch(&CreateBatchRequest::new("file-abc")).await.unwrap();

    assert_eq!(batch.id, "batch_123");
    assert_eq!(batch.status, BatchStatus::Validating);
    assert!(batch.output_file_id.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_batch_unauthorized() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/v1/batches")
        .with_status(401)
        .with_body(r#"{"error": "Unauthorized"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.create_batch(&CreateBatchRequest::new("file-abc")).await;

    match result {
        Err(ApiError::AuthenticationFailed(msg)) => {
            assert!(msg.contains("batch creation"));
        }
        other => panic!("Expected AuthenticationFailed, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retrieve_batch_completed() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/v1/batches/batch_123")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"id": "batch_123", "status": "completed", "output_file_id": "file-out",
                "request_counts": {"total": 3, "completed": 3, "failed": 0}}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let batch = client.retrieve_batch("batch_123").await.unwrap();

    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.output_file_id.as_deref(), Some("file-out"));
    assert_eq!(batch.request_counts.unwrap().completed, 3);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retrieve_batch_rate_limited() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/v1/batches/batch_123")
        .with_status(429)
        .with_body(r#"{"error": {"message": "Rate limit reached"}}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.retrieve_batch("batch_123").await;

    assert!(matches!(result, Err(ApiError::QuotaExceeded { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_file_content_returns_raw_text() {
    let mut server = mockito::Server::new_async().await;

    let body = "{\"custom_id\":\"request-2\"}\n{\"custom_id\":\"request-1\"}\n";
    let mock = server
        .mock("GET", "/v1/files/file-out/content")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = client_for(&server);
    let content = client.file_content("file-out").await.unwrap();

    assert_eq!(content, body);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_file_content_not_found() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/v1/files/file-missing/content")
        .with_status(404)
        .with_body(r#"{"error": "No such File object"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let result = client.file_content("file-missing").await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
    mock.assert_async().await;
}
