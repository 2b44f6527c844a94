//! Result reconciliation.
//!
//! The output artifact is joined with the inputs by `custom_id`. Line order in
//! the artifact carries no meaning.

use crate::batch::error::{BatchError, Result};
use crate::batch::types::{InputRecords, OutputRecord, ParsePolicy, ResultRow, ResultTable};
use promptbatch_abstraction::{BatchApi, BatchObject};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Downloads the output artifact of a completed batch.
///
/// # Errors
/// Returns `ResultFetchError` if the batch has no output file or the download fails.
pub async fn fetch_results(api: &dyn BatchApi, batch: &BatchObject) -> Result<String> {
    let output_file_id = batch.output_file_id.as_deref().ok_or_else(|| {
        BatchError::ResultFetchError {
            batch_id: batch.id.clone(),
            reason: format!("batch has no output file (status {})", batch.status),
        }
    })?;

    let content = api.file_content(output_file_id).await.map_err(|e| {
        BatchError::ResultFetchError { batch_id: batch.id.clone(), reason: e.to_string() }
    })?;

    debug!(batch_id = %batch.id, output_file_id, bytes = content.len(), "Downloaded results");
    Ok(content)
}

/// Maps `custom_id` to completion text for every usable line of `artifact`.
///
/// Blank lines are ignored. Records without a first-choice message are skipped.
/// When an id appears twice the later line wins.
///
/// # Errors
/// Under `ParsePolicy::Strict` returns `ParseError` for the first line that is not JSON.
pub fn parse_output(artifact: &str, policy: ParsePolicy) -> Result<HashMap<String, String>> {
    let mut outputs = HashMap::new();

    for (index, line) in artifact.split('\n').enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(source) => match policy {
                ParsePolicy::Strict => return Err(BatchError::ParseError { line: index + 1, source }),
                ParsePolicy::Lenient => {
                    warn!(line = index + 1, error = %source, "Skipping malformed output line");
                    continue;
                }
            },
        };

        match OutputRecord::from_value(&value) {
            Some(record) => {
                outputs.insert(record.custom_id, record.content);
            }
            None => debug!(line = index + 1, "Output line has no completion"),
        }
    }

    Ok(outputs)
}

/// Aligns `outputs` with the inputs; prompts without a completion get an empty output.
pub fn build_table(inputs: &InputRecords, outputs: &HashMap<String, String>) -> ResultTable {
    let mut matched = 0;
    let rows = inputs
        .iter_with_ids()
        .map(|(id, prompt)| {
            let output = match outputs.get(&id) {
                Some(content) => {
                    matched += 1;
                    content.clone()
                }
                None => String::new(),
            };
            ResultRow { input: prompt.to_string(), output }
        })
        .collect();

    ResultTable::new(rows, matched)
}

/// Parses `artifact` and joins it with `inputs`.
///
/// # Errors
/// See [`parse_output`].
pub fn reconcile(artifact: &str, inputs: &InputRecords, policy: ParsePolicy) -> Result<ResultTable> {
    let outputs = parse_output(artifact, policy)?;
    let table = build_table(inputs, &outputs);

    if table.missing() > 0 {
        warn!(missing = table.missing(), total = table.len(), "Some prompts have no completion");
    }
    debug!(rows = table.len(), matched = table.matched(), "Reconciled results");

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptbatch_abstraction::BatchStatus;
    use promptbatch_client::{MOCK_OUTPUT_FILE_ID, MockBatchApi};
    use serde_json::json;

    fn inputs(lines: &[&str]) -> InputRecords {
        InputRecords::new(lines.iter().map(|s| (*s).to_string()).collect())
    }

    fn line(id: &str, content: &str) -> String {
        json!({
            "id": "batch_req_1",
            "custom_id": id,
            "response": {
                "status_code": 200,
                "body": {"choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]}
            },
            "error": null
        })
        .to_string()
    }

    fn rows(table: &ResultTable) -> Vec<(&str, &str)> {
        table.rows().iter().map(|r| (r.input.as_str(), r.output.as_str())).collect()
    }

    #[test]
    fn test_reconcile_matches_by_id() {
        let artifact = [line("request-1", "A"), line("request-2", "B")].join("\n");
        let table = reconcile(&artifact, &inputs(&["x", "y"]), ParsePolicy::Strict).unwrap();

        assert_eq!(rows(&table), [("x", "A"), ("y", "B")]);
        assert_eq!(table.matched(), 2);
    }

    #[test]
    fn test_reconcile_ignores_line_order() {
        let forward = [line("request-1", "A"), line("request-2", "B")].join("\n");
        let reversed = [line("request-2", "B"), line("request-1", "A")].join("\n");
        let records = inputs(&["x", "y"]);

        assert_eq!(
            reconcile(&forward, &records, ParsePolicy::Strict).unwrap(),
            reconcile(&reversed, &records, ParsePolicy::Strict).unwrap()
        );
    }

    #[test]
    fn test_reconcile_missing_output_is_empty() {
        let artifact = line("request-1", "A");
        let table = reconcile(&artifact, &inputs(&["x", "y"]), ParsePolicy::Strict).unwrap();

        assert_eq!(rows(&table), [("x", "A"), ("y", "")]);
        assert_eq!(table.missing(), 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let artifact = format!("{}\n\n{}\n", line("request-2", "B"), line("request-1", "A"));
        let records = inputs(&["x", "y", "z"]);

        let first = reconcile(&artifact, &records, ParsePolicy::Strict).unwrap();
        let second = reconcile(&artifact, &records, ParsePolicy::Strict).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_output_last_write_wins() {
        let artifact = [line("request-1", "old"), line("request-1", "new")].join("\n");
        let outputs = parse_output(&artifact, ParsePolicy::Strict).unwrap();
        assert_eq!(outputs["request-1"], "new");
    }

    #[test]
    fn test_parse_output_skips_records_without_choices() {
        let errored = json!({
            "custom_id": "request-1",
            "response": null,
            "error": {"code": "batch_expired", "message": "expired"}
        })
        .to_string();
        let artifact = [errored, line("request-2", "B")].join("\n");

        let outputs = parse_output(&artifact, ParsePolicy::Strict).unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(!outputs.contains_key("request-1"));
    }

    #[test]
    fn test_parse_output_strict_aborts_on_malformed_line() {
        let artifact = format!("{}\nnot json\n{}", line("request-1", "A"), line("request-2", "B"));

        match parse_output(&artifact, ParsePolicy::Strict) {
            Err(BatchError::ParseError { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_output_lenient_skips_malformed_line() {
        let artifact = format!("{}\n{{broken\n{}", line("request-1", "A"), line("request-2", "B"));
        let outputs = parse_output(&artifact, ParsePolicy::Lenient).unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs["request-2"], "B");
    }

    #[test]
    fn test_parse_output_tolerates_crlf() {
        let artifact = format!("{}\r\n{}\r\n", line("request-1", "A"), line("request-2", "B"));
        let outputs = parse_output(&artifact, ParsePolicy::Strict).unwrap();
        assert_eq!(outputs.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_results_requires_output_file() {
        let api = MockBatchApi::new();
        let batch = BatchObject {
            id: "batch_1".to_string(),
            status: BatchStatus::InProgress,
            endpoint: None,
            input_file_id: None,
            completion_window: None,
            output_file_id: None,
            error_file_id: None,
            created_at: None,
            request_counts: None,
        };

        let result = fetch_results(&api, &batch).await;
        assert!(matches!(result, Err(BatchError::ResultFetchError { .. })));
        assert_eq!(api.content_calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_results_downloads_output() {
        let api = MockBatchApi::new().with_output(line("request-1", "A"));
        let batch = api.retrieve_batch("batch_1").await.unwrap();
        assert_eq!(batch.output_file_id.as_deref(), Some(MOCK_OUTPUT_FILE_ID));

        let content = fetch_results(&api, &batch).await.unwrap();
        assert!(content.contains("request-1"));
    }

    #[tokio::test]
    async fn test_fetch_results_download_failure() {
        let api = MockBatchApi::new();
        let mut batch = api.retrieve_batch("batch_1").await.unwrap();
        batch.output_file_id = Some("file-gone".to_string());

        let result = fetch_results(&api, &batch).await;
        assert!(matches!(result, Err(BatchError::ResultFetchError { .. })));
    }
}
