//! Data types for the batch lifecycle.

use once_cell::sync::Lazy;
use promptbatch_abstraction::DEFAULT_ENDPOINT;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Temperature used when the configured value is not a number.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Token limit used when the configured value is not a positive integer.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

static FLOAT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("valid float regex")
});

static INT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+").expect("valid integer regex"));

/// Returns the custom id for the prompt at 1-based `position`.
pub fn custom_id(position: usize) -> String {
    format!("request-{position}")
}

/// The prompts of one run, in file order.
///
/// Position determines identity: the prompt at index `i` is always
/// `request-{i + 1}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecords {
    lines: Vec<String>,
}

impl InputRecords {
    /// Wraps already-cleaned prompt lines.
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Number of prompts.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether there are no prompts.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The prompt lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Iterates `(custom id, prompt)` pairs in order.
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (String, &str)> {
        self.lines.iter().enumerate().map(|(i, line)| (custom_id(i + 1), line.as_str()))
    }
}

/// A single chat message inside an encoded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender role ("system" or "user").
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Chat completion body carried by every encoded request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Model to run.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
    /// System message followed by the user prompt.
    pub messages: Vec<ChatMessage>,
}

/// One line of the batch input artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRequest {
    /// Caller-assigned identifier used to match the response.
    pub custom_id: String,
    /// HTTP method, always "POST".
    pub method: String,
    /// Target endpoint.
    pub url: String,
    /// Completion parameters.
    pub body: RequestBody,
}

/// Fixed parameters applied to every prompt of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    /// Model name, passed through unvalidated.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
    /// System message sent before each prompt.
    pub system_message: String,
    /// Endpoint each request targets.
    pub endpoint: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_message: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl RequestConfig {
    /// Builds a config from raw form strings.
    ///
    /// Only numeric coercion is applied: the temperature is the leading decimal
    /// prefix of `temperature` (0 when there is none) and the token limit is the
    /// leading integer prefix of `max_tokens` (1000 when there is none, it is
    /// zero or negative, or it does not fit in a `u32`).
    pub fn from_raw(
        model: impl Into<String>,
        temperature: &str,
        max_tokens: &str,
        system_message: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            temperature: coerce_temperature(temperature),
            max_tokens: coerce_max_tokens(max_tokens),
            system_message: system_message.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Parses the leading float of `raw`, falling back to the default temperature.
pub fn coerce_temperature(raw: &str) -> f32 {
    FLOAT_PREFIX
        .find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|t| t.is_finite())
        .unwrap_or(DEFAULT_TEMPERATURE)
}

/// Parses the leading integer of `raw`, falling back to the default token limit
/// for missing, non-positive or out-of-range values.
pub fn coerce_max_tokens(raw: &str) -> u32 {
    INT_PREFIX
        .find(raw.trim_start())
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(DEFAULT_MAX_TOKENS)
}

/// A completion extracted from one line of the output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// Identifier echoed back by the service.
    pub custom_id: String,
    /// Completion text; empty when the service returned null.
    pub content: String,
}

impl OutputRecord {
    /// Extracts the first choice of a response line.
    ///
    /// Returns `None` when the line lacks `custom_id` or the
    /// `response.body.choices[0].message.content` structure.
    pub fn from_value(value: &Value) -> Option<Self> {
        let custom_id = value.get("custom_id")?.as_str()?.to_string();
        let content = match value.pointer("/response/body/choices/0/message/content")? {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Some(Self { custom_id, content })
    }
}

/// One exported row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// The original prompt.
    pub input: String,
    /// The completion, or empty when none matched.
    pub output: String,
}

/// Reconciled results aligned with the input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
    matched: usize,
}

impl ResultTable {
    /// Creates a table from rows and the number of rows that found a completion.
    pub fn new(rows: Vec<ResultRow>, matched: usize) -> Self {
        Self { rows, matched }
    }

    /// The rows in input order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows whose prompt had a matching completion.
    pub fn matched(&self) -> usize {
        self.matched
    }

    /// Number of rows left with an empty output.
    pub fn missing(&self) -> usize {
        self.rows.len() - self.matched
    }
}

/// What to do with an output line that is not valid JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Abort reconciliation with a parse error.
    #[default]
    Strict,
    /// Skip the line and log a warning.
    Lenient,
}

/// Schedule for batch status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the first status query.
    pub interval: Duration,
    /// Growth factor applied to the delay after each query (1.0 keeps it fixed).
    pub multiplier: f64,
    /// Upper bound on the delay.
    pub max_interval: Duration,
    /// Maximum number of status queries; unlimited when `None`.
    pub max_attempts: Option<u32>,
    /// Consecutive failed status queries tolerated before giving up.
    pub max_consecutive_errors: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            multiplier: 1.0,
            max_interval: Duration::from_secs(60),
            max_attempts: None,
            max_consecutive_errors: 3,
        }
    }
}

impl PollPolicy {
    /// A fixed-interval policy.
    pub fn fixed(interval: Duration) -> Self {
        Self { interval, max_interval: interval.max(Duration::from_secs(60)), ..Self::default() }
    }

    /// Enables exponential backoff.
    #[must_use]
    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    /// Caps the number of status queries.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets how many consecutive failed status queries are tolerated.
    #[must_use]
    pub fn with_max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Calculate the delay before status query number `attempt` (0-based).
    ///
    /// Uses exponential backoff: interval * multiplier^attempt, capped at max_interval.
    /// A multiplier of 1.0 or less keeps the interval fixed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1.0 {
            return self.interval;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = (self.interval.as_millis() as f64 * self.multiplier.powi(exponent))
            .min(self.max_interval.as_millis() as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_custom_id_is_one_based() {
        assert_eq!(custom_id(1), "request-1");
        assert_eq!(custom_id(42), "request-42");
    }

    #[test]
    fn test_iter_with_ids() {
        let records = InputRecords::new(vec!["a".to_string(), "b".to_string()]);
        let pairs: Vec<_> = records.iter_with_ids().collect();
        assert_eq!(pairs, vec![("request-1".to_string(), "a"), ("request-2".to_string(), "b")]);
    }

    #[test]
    fn test_coerce_temperature() {
        assert!((coerce_temperature("0.7") - 0.7).abs() < f32::EPSILON);
        assert!((coerce_temperature(" 1.5abc") - 1.5).abs() < f32::EPSILON);
        assert!((coerce_temperature(".5") - 0.5).abs() < f32::EPSILON);
        assert_eq!(coerce_temperature("warm"), 0.0);
        assert_eq!(coerce_temperature(""), 0.0);
        assert_eq!(coerce_temperature("1e999"), 0.0);
    }

    #[test]
    fn test_coerce_max_tokens() {
        assert_eq!(coerce_max_tokens("256"), 256);
        assert_eq!(coerce_max_tokens("300.9"), 300);
        assert_eq!(coerce_max_tokens("12 tokens"), 12);
        assert_eq!(coerce_max_tokens("lots"), 1000);
        assert_eq!(coerce_max_tokens(""), 1000);
        assert_eq!(coerce_max_tokens("0"), 1000);
        assert_eq!(coerce_max_tokens("-5"), 1000);
        assert_eq!(coerce_max_tokens("4294967296"), 1000);
        assert_eq!(coerce_max_tokens("4294967295"), u32::MAX);
    }

    #[test]
    fn test_output_record_from_value() {
        let value = json!({
            "custom_id": "request-3",
            "response": {"body": {"choices": [{"message": {"content": "Hi"}}]}}
        });
        let record = OutputRecord::from_value(&value).unwrap();
        assert_eq!(record.custom_id, "request-3");
        assert_eq!(record.content, "Hi");
    }

    #[test]
    fn test_output_record_null_content_is_empty() {
        let value = json!({
            "custom_id": "request-1",
            "response": {"body": {"choices": [{"message": {"content": null}}]}}
        });
        assert_eq!(OutputRecord::from_value(&value).unwrap().content, "");
    }

    #[test]
    fn test_output_record_missing_structure() {
        let errored = json!({"custom_id": "request-1", "response": null, "error": {"code": "x"}});
        assert!(OutputRecord::from_value(&errored).is_none());

        let no_choices = json!({"custom_id": "request-1", "response": {"body": {"choices": []}}});
        assert!(OutputRecord::from_value(&no_choices).is_none());

        let no_id = json!({"response": {"body": {"choices": [{"message": {"content": "x"}}]}}});
        assert!(OutputRecord::from_value(&no_id).is_none());
    }

    #[test]
    fn test_poll_policy_fixed_delay() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_poll_policy_backoff_is_capped() {
        let policy = PollPolicy::fixed(Duration::from_secs(1))
            .with_backoff(2.0, Duration::from_secs(10));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[test]
    fn test_result_table_counts() {
        let table = ResultTable::new(
            vec![
                ResultRow { input: "x".to_string(), output: "A".to_string() },
                ResultRow { input: "y".to_string(), output: String::new() },
            ],
            1,
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.matched(), 1);
        assert_eq!(table.missing(), 1);
    }
}
