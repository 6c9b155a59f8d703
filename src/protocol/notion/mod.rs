//! Wire types of the Notion `runInferenceTranscript` endpoint.
pub mod decoder;
pub mod encoder;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content type tag Notion uses for markdown chat turns and the config item.
pub const MARKDOWN_CHAT: &str = "markdown-chat";

/// Value of the leading `config` transcript item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptConfigValue {
    #[serde(rename = "type")]
    pub content_type: String,
    pub model: String,
}

/// One entry of the transcript sent upstream.
///
/// User turns carry nested rich-text arrays; assistant turns carry plain markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TranscriptItem {
    #[serde(rename = "config")]
    Config(TranscriptConfigValue),
    #[serde(rename = "user")]
    User(Vec<Vec<String>>),
    #[serde(rename = "markdown-chat")]
    AssistantMarkdown(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugOverrides {
    pub cached_inferences: serde_json::Map<String, serde_json::Value>,
    pub annotation_inferences: serde_json::Map<String, serde_json::Value>,
    pub emit_inferences: bool,
}

/// Request body posted to the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamEnvelope {
    pub trace_id: Uuid,
    pub space_id: String,
    pub transcript: Vec<TranscriptItem>,
    pub create_thread: bool,
    pub debug_overrides: DebugOverrides,
    pub generate_title: bool,
    pub save_all_thread_operations: bool,
}

/// What one NDJSON line from the backend means to the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// Non-empty assistant text.
    Fragment(String),
    /// A record carrying `recordMap`; no useful content follows it.
    Terminal,
    /// Anything else, including `markdown-chat` records with empty or non-string values.
    Ignored,
}
