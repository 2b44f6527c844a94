//! Prompt file parsing.

use crate::batch::error::{BatchError, Result};
use crate::batch::formats::{InputFormat, detect_format};
use crate::batch::types::InputRecords;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Parse a prompt file.
///
/// Auto-detects format (line-delimited or JSON array) and parses accordingly.
///
/// # Errors
/// Returns `BatchError::ReadError` if the file is missing, not UTF-8, or holds no prompts.
pub fn parse_input_file(file_path: &Path) -> Result<InputRecords> {
    let label = file_path.display().to_string();

    let bytes = std::fs::read(file_path)
        .map_err(|e| BatchError::ReadError { path: label.clone(), reason: e.to_string() })?;

    let content = String::from_utf8(bytes).map_err(|e| BatchError::ReadError {
        path: label.clone(),
        reason: format!("not valid UTF-8: {}", e),
    })?;

    let records = parse_content(&content, &label)?;
    debug!(path = %label, prompts = records.len(), "Parsed input file");
    Ok(records)
}

/// Parse prompt text that did not come from a file.
///
/// # Errors
/// Returns `BatchError::ReadError` if the text holds no prompts.
pub fn parse_input_str(content: &str) -> Result<InputRecords> {
    parse_content(content, "<input>")
}

fn parse_content(content: &str, label: &str) -> Result<InputRecords> {
    let content = content.trim_start_matches('\u{feff}');

    let lines = match detect_format(content) {
        None => Vec::new(),
        Some(InputFormat::LineDelimited) => parse_line_delimited(content),
        Some(InputFormat::JsonArray) => parse_json_array(content, label)?,
    };

    if lines.is_empty() {
        return Err(BatchError::ReadError {
            path: label.to_string(),
            reason: "no prompts found".to_string(),
        });
    }

    Ok(InputRecords::new(lines))
}

/// Each non-empty trimmed line becomes a prompt.
fn parse_line_delimited(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse JSON array format.
///
/// Expected format:
/// ```json
/// ["Prompt 1", {"prompt": "Prompt 2"}]
/// ```
fn parse_json_array(content: &str, label: &str) -> Result<Vec<String>> {
    let read_error = |reason: String| BatchError::ReadError { path: label.to_string(), reason };

    let json: Value = serde_json::from_str(content)
        .map_err(|e| read_error(format!("invalid JSON: {} (at line {})", e, e.line())))?;

    let array = json.as_array().ok_or_else(|| read_error("JSON root must be an array".to_string()))?;

    let mut prompts = Vec::with_capacity(array.len());
    for (index, item) in array.iter().enumerate() {
        let prompt = match item {
            Value::String(s) => s.as_str(),
            Value::Object(obj) => obj.get("prompt").and_then(Value::as_str).ok_or_else(|| {
                read_error(format!("array item {} missing required 'prompt' field", index))
            })?,
            _ => {
                return Err(read_error(format!(
                    "array item {} must be a string or an object",
                    index
                )));
            }
        };

        let prompt = prompt.trim();
        if !prompt.is_empty() {
            prompts.push(prompt.to_string());
        }
    }

    Ok(prompts)
}
