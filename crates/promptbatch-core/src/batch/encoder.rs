//! Request encoding.
//!
//! Turns prompt lines into batch request objects and the line-delimited
//! artifact that is uploaded.

use crate::batch::error::Result;
use crate::batch::types::{ChatMessage, EncodedRequest, InputRecords, RequestBody, RequestConfig};

/// Encodes one request per prompt, in input order, with ids `request-1..request-n`.
pub fn encode(inputs: &InputRecords, config: &RequestConfig) -> Vec<EncodedRequest> {
    inputs
        .iter_with_ids()
        .map(|(custom_id, prompt)| EncodedRequest {
            custom_id,
            method: "POST".to_string(),
            url: config.endpoint.clone(),
            body: RequestBody {
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                messages: vec![
                    ChatMessage { role: "system".to_string(), content: config.system_message.clone() },
                    ChatMessage { role: "user".to_string(), content: prompt.to_string() },
                ],
            },
        })
        .collect()
}

/// Serializes requests as JSON lines joined by `\n`, in order, without a trailing newline.
pub fn to_jsonl(requests: &[EncodedRequest]) -> Result<String> {
    let lines = requests.iter().map(serde_json::to_string).collect::<serde_json::Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn inputs(lines: &[&str]) -> InputRecords {
        InputRecords::new(lines.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_encode_assigns_sequential_ids() {
        let config = RequestConfig::default();
        let requests = encode(&inputs(&["a", "b", "c"]), &config);

        assert_eq!(requests.len(), 3);
        let ids: Vec<_> = requests.iter().map(|r| r.custom_id.as_str()).collect();
        assert_eq!(ids, ["request-1", "request-2", "request-3"]);
    }

    #[test]
    fn test_encode_carries_config() {
        let config = RequestConfig::from_raw("gpt-4o", "0.3", "64", "Answer in French.");
        let requests = encode(&inputs(&["Hello"]), &config);
        let request = &requests[0];

        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "/v1/chat/completions");
        assert_eq!(request.body.model, "gpt-4o");
        assert_eq!(request.body.max_tokens, 64);
        assert_eq!(request.body.messages.len(), 2);
        assert_eq!(request.body.messages[0].role, "system");
        assert_eq!(request.body.messages[0].content, "Answer in French.");
        assert_eq!(request.body.messages[1].role, "user");
        assert_eq!(request.body.messages[1].content, "Hello");
    }

    #[test]
    fn test_to_jsonl_wire_shape() {
        let config = RequestConfig::from_raw("gpt-4o-mini", "0.5", "100", "sys");
        let requests = encode(&inputs(&["first", "second"]), &config);
        let jsonl = to_jsonl(&requests).unwrap();

        assert!(!jsonl.ends_with('\n'));
        let lines: Vec<&str> = jsonl.split('\n').collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["custom_id"], "request-1");
        assert_eq!(first["method"], "POST");
        assert_eq!(first["url"], "/v1/chat/completions");
        assert_eq!(first["body"]["model"], "gpt-4o-mini");
        assert_eq!(first["body"]["temperature"], 0.5);
        assert_eq!(first["body"]["max_tokens"], 100);
        assert_eq!(first["body"]["messages"][1]["content"], "first");

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["custom_id"], "request-2");
    }

    #[test]
    fn test_to_jsonl_escapes_embedded_newlines() {
        let requests = encode(&inputs(&["line one\nline two"]), &RequestConfig::default());
        let jsonl = to_jsonl(&requests).unwrap();
        assert_eq!(jsonl.lines().count(), 1);
    }
}
