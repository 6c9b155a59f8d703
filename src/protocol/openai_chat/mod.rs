pub mod response_encoder;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProxyError;

/// Role of a chat message. Anything else is rejected during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A validated chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Chat completion request as it arrives on the wire, before validation.
///
/// Messages stay untyped so validation can report which entry is wrong.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequestWire {
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
    /// Any JSON value; coerced with [`is_truthy`].
    #[serde(default)]
    pub stream: Option<Value>,
    #[serde(default)]
    pub notion_model: Option<String>,
}

/// Fallback values for optional request fields.
#[derive(Debug, Clone, Copy)]
pub struct RequestDefaults<'a> {
    pub model: &'a str,
    pub notion_model: &'a str,
}

/// A validated chat completion request with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub stream: bool,
    pub notion_model: String,
}

impl ChatCompletionRequest {
    /// Parse and validate a raw JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] when the body is not a JSON object of the
    /// expected shape.
    pub fn from_json_slice(body: &[u8], defaults: RequestDefaults<'_>) -> Result<Self, ProxyError> {
        let wire: ChatCompletionRequestWire = serde_json::from_slice(body).map_err(|e| {
            ProxyError::InvalidRequest(format!("Invalid chat completion request body: {e}"))
        })?;
        Self::from_wire(wire, defaults)
    }

    /// Validate a wire request and apply defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] when `messages` is missing or empty, or when any
    /// message is not an object with a known role and string content.
    pub fn from_wire(
        wire: ChatCompletionRequestWire,
        defaults: RequestDefaults<'_>,
    ) -> Result<Self, ProxyError> {
        let raw_messages = match wire.messages {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return Err(ProxyError::InvalidRequest(
                    "messages must be a non-empty array".to_string(),
                ))
            }
        };

        let messages = raw_messages
            .into_iter()
            .enumerate()
            .map(|(index, raw)| validate_message(index, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            messages,
            model: non_empty_or(wire.model, defaults.model),
            stream: wire.stream.as_ref().is_some_and(is_truthy),
            notion_model: non_empty_or(wire.notion_model, defaults.notion_model),
        })
    }
}

/// Loose boolean reading of a JSON value. `false`, `null`, numeric zero and `""` are false;
/// everything else is true, including empty arrays and objects.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn validate_message(index: usize, raw: Value) -> Result<ChatMessage, ProxyError> {
    let Value::Object(mut fields) = raw else {
        return Err(ProxyError::InvalidRequest(format!(
            "messages[{index}] must be an object"
        )));
    };

    let role = fields
        .get("role")
        .and_then(Value::as_str)
        .and_then(ChatRole::parse)
        .ok_or_else(|| {
            ProxyError::InvalidRequest(format!(
                "messages[{index}].role must be one of system, user or assistant"
            ))
        })?;

    let Some(Value::String(content)) = fields.remove("content") else {
        return Err(ProxyError::InvalidRequest(format!(
            "messages[{index}].content must be a string"
        )));
    };

    Ok(ChatMessage { role, content })
}

/// Incremental content of one streamed choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A single choice inside a streamed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChoiceDelta,
    pub finish_reason: Option<String>,
}

/// `chat.completion.chunk` object sent once per streamed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

/// Assistant message of a buffered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A single choice in the buffered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseChoice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: String,
}

/// Token usage. The backend reports none, so every field serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// `chat.completion` object returned in buffered mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ResponseChoice>,
    pub usage: Usage,
}

/// Entry of the `/v1/models` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub owned_by: String,
}

/// `/v1/models` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULTS: RequestDefaults<'static> = RequestDefaults {
        model: "notion-proxy",
        notion_model: "anthropic-opus-4",
    };

    fn parse(body: &Value) -> Result<ChatCompletionRequest, ProxyError> {
        ChatCompletionRequest::from_json_slice(body.to_string().as_bytes(), DEFAULTS)
    }

    #[test]
    fn test_defaults_applied() {
        let req = parse(&json!({"messages": [{"role": "user", "content": "hi"}]})).unwrap();
        assert_eq!(req.model, "notion-proxy");
        assert_eq!(req.notion_model, "anthropic-opus-4");
        assert!(!req.stream);
        assert_eq!(req.messages, vec![ChatMessage::new(ChatRole::User, "hi")]);
    }

    #[test]
    fn test_explicit_fields_kept() {
        let req = parse(&json!({
            "model": "gpt-4o",
            "stream": true,
            "notion_model": "openai-gpt-4.1",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "assistant", "content": "ok"}
            ]
        }))
        .unwrap();
        assert_eq!(req.model, "gpt-4o");
        assert!(req.stream);
        assert_eq!(req.notion_model, "openai-gpt-4.1");
        assert_eq!(req.messages[0].role, ChatRole::System);
        assert_eq!(req.messages[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_stream_flag_is_coerced() {
        let body = |stream: Value| {
            json!({"stream": stream, "messages": [{"role": "user", "content": "hi"}]})
        };
        let truthy_values = [
            json!(true),
            json!(1),
            json!(-2.5),
            json!("true"),
            json!("false"),
            json!([]),
            json!({}),
        ];
        for truthy in truthy_values {
            assert!(parse(&body(truthy.clone())).unwrap().stream, "{truthy}");
        }
        for falsy in [json!(false), json!(0), json!(0.0), json!(""), Value::Null] {
            assert!(!parse(&body(falsy.clone())).unwrap().stream, "{falsy}");
        }
    }

    #[test]
    fn test_empty_model_strings_fall_back_to_defaults() {
        let req = parse(&json!({
            "model": "",
            "notion_model": "",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert_eq!(req.model, "notion-proxy");
        assert_eq!(req.notion_model, "anthropic-opus-4");
    }

    #[test]
    fn test_missing_or_empty_messages_rejected() {
        for body in [json!({}), json!({"messages": []}), json!({"messages": "hi"})] {
            let err = parse(&body).unwrap_err();
            assert!(matches!(err, ProxyError::InvalidRequest(msg) if msg.contains("non-empty")));
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        let err = parse(&json!({"messages": [
            {"role": "user", "content": "hi"},
            {"role": "tool", "content": "result"}
        ]}))
        .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(msg) if msg.contains("messages[1].role")));
    }

    #[test]
    fn test_non_string_content_rejected() {
        let err = parse(&json!({"messages": [
            {"role": "user", "content": [{"type": "text", "text": "hi"}]}
        ]}))
        .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(msg) if msg.contains("content")));
    }

    #[test]
    fn test_non_object_message_rejected() {
        let err = parse(&json!({"messages": ["hi"]})).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(msg) if msg.contains("object")));
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = ChatCompletionRequest::from_json_slice(b"[1,2]", DEFAULTS).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(_)));
        let err = ChatCompletionRequest::from_json_slice(b"not json", DEFAULTS).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidRequest(_)));
    }

    #[test]
    fn test_usage_serializes_nulls() {
        let value = serde_json::to_value(Usage::default()).unwrap();
        assert_eq!(
            value,
            json!({"prompt_tokens": null, "completion_tokens": null, "total_tokens": null})
        );
    }

    #[test]
    fn test_empty_delta_serializes_as_empty_object() {
        let choice = ChunkChoice {
            index: 0,
            delta: ChoiceDelta::default(),
            finish_reason: Some("stop".to_string()),
        };
        let value = serde_json::to_value(choice).unwrap();
        assert_eq!(value, json!({"index": 0, "delta": {}, "finish_reason": "stop"}));
    }
}
