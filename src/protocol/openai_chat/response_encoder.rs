use crate::util::{push_json_string_escaped, push_u64_decimal, unix_now_secs};

use super::{ChatCompletionResponse, ChatRole, ResponseChoice, ResponseMessage, Usage};

pub const CHUNK_OBJECT: &str = "chat.completion.chunk";
pub const RESPONSE_OBJECT: &str = "chat.completion";
pub const FINISH_REASON_STOP: &str = "stop";

/// Identity shared by every object emitted for one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMeta {
    pub id: String,
    pub created: u64,
    pub model: String,
}

impl CompletionMeta {
    #[must_use]
    pub fn new(id: String, model: impl Into<String>) -> Self {
        Self {
            id,
            created: unix_now_secs(),
            model: model.into(),
        }
    }

    #[must_use]
    pub fn buffered_response(&self, content: String) -> ChatCompletionResponse {
        ChatCompletionResponse {
            id: self.id.clone(),
            object: RESPONSE_OBJECT.to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ResponseChoice {
                index: 0,
                message: ResponseMessage {
                    role: ChatRole::Assistant,
                    content,
                },
                finish_reason: FINISH_REASON_STOP.to_string(),
            }],
            usage: Usage::default(),
        }
    }
}

/// Write `{"id":..,"object":..,"created":..,"model":..,"choices":[` into `out`.
fn push_chunk_prefix(out: &mut String, meta: &CompletionMeta) {
    out.push_str("{\"id\":");
    push_json_string_escaped(out, &meta.id);
    out.push_str(",\"object\":\"");
    out.push_str(CHUNK_OBJECT);
    out.push_str("\",\"created\":");
    push_u64_decimal(out, meta.created);
    out.push_str(",\"model\":");
    push_json_string_escaped(out, &meta.model);
    out.push_str(",\"choices\":[");
}

/// Append a content chunk as one SSE `data:` frame.
///
/// Byte-for-byte the same JSON `serde_json` produces for the equivalent
/// [`ChatCompletionChunk`](super::ChatCompletionChunk), without building it.
pub fn push_content_chunk_frame(out: &mut String, meta: &CompletionMeta, text: &str) {
    out.push_str("data: ");
    push_chunk_prefix(out, meta);
    out.push_str("{\"index\":0,\"delta\":{\"content\":");
    push_json_string_escaped(out, text);
    out.push_str("},\"finish_reason\":null}]}\n\n");
}

/// Append the final stop chunk as one SSE `data:` frame.
pub fn push_stop_chunk_frame(out: &mut String, meta: &CompletionMeta) {
    out.push_str("data: ");
    push_chunk_prefix(out, meta);
    out.push_str("{\"index\":0,\"delta\":{},\"finish_reason\":\"");
    out.push_str(FINISH_REASON_STOP);
    out.push_str("\"}]}\n\n");
}
