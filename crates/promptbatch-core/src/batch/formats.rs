//! Input format detection for prompt files.

use serde_json::Value;

/// Supported prompt file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One prompt per line.
    LineDelimited,
    /// JSON array of strings or `{"prompt": ...}` objects.
    JsonArray,
}

/// Detects the input format based on file content.
///
/// Content is a JSON array only when it starts with `[` and parses as one;
/// anything else, including text lines that happen to start with `[`, is
/// line-delimited. Returns `None` for blank content.
pub fn detect_format(content: &str) -> Option<InputFormat> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();

    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with('[') && serde_json::from_str::<Vec<Value>>(trimmed).is_ok() {
        Some(InputFormat::JsonArray)
    } else {
        Some(InputFormat::LineDelimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format_line_delimited() {
        let content = "Prompt 1\nPrompt 2\nPrompt 3";
        assert_eq!(detect_format(content), Some(InputFormat::LineDelimited));
    }

    #[test]
    fn test_detect_format_json_array() {
        assert_eq!(detect_format("  [\"a\", \"b\"]"), Some(InputFormat::JsonArray));
    }

    #[test]
    fn test_detect_format_bom_prefixed() {
        assert_eq!(detect_format("\u{feff}[\"a\"]"), Some(InputFormat::JsonArray));
    }

    #[test]
    fn test_detect_format_bracketed_text_lines() {
        let content = "[Q1] What is 2+2?\n[Q2] Name a colour.\n";
        assert_eq!(detect_format(content), Some(InputFormat::LineDelimited));
        assert_eq!(detect_format("[not json"), Some(InputFormat::LineDelimited));
    }

    #[test]
    fn test_detect_format_empty() {
        assert_eq!(detect_format(""), None);
        assert_eq!(detect_format(" \n\t\n"), None);
    }
}
