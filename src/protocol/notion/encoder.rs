use crate::protocol::openai_chat::{ChatMessage, ChatRole};
use crate::util::random_uuid;

use super::{DebugOverrides, TranscriptConfigValue, TranscriptItem, UpstreamEnvelope, MARKDOWN_CHAT};

/// Map chat messages onto a Notion transcript, config item first.
///
/// Order is preserved and nothing is merged.
#[must_use]
pub fn build_transcript(messages: &[ChatMessage], notion_model: &str) -> Vec<TranscriptItem> {
    let mut transcript = Vec::with_capacity(messages.len() + 1);
    transcript.push(TranscriptItem::Config(TranscriptConfigValue {
        content_type: MARKDOWN_CHAT.to_string(),
        model: notion_model.to_string(),
    }));
    transcript.extend(messages.iter().map(|message| match message.role {
        ChatRole::Assistant => TranscriptItem::AssistantMarkdown(message.content.clone()),
        ChatRole::System | ChatRole::User => {
            TranscriptItem::User(vec![vec![message.content.clone()]])
        }
    }));
    transcript
}

/// Wrap a transcript into a request envelope with a fresh trace id.
#[must_use]
pub fn build_envelope(space_id: &str, transcript: Vec<TranscriptItem>) -> UpstreamEnvelope {
    UpstreamEnvelope {
        trace_id: random_uuid(),
        space_id: space_id.to_string(),
        transcript,
        create_thread: true,
        debug_overrides: DebugOverrides::default(),
        generate_title: false,
        save_all_thread_operations: true,
    }
}
