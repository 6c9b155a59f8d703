use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use super::{UpstreamEvent, MARKDOWN_CHAT};

/// The parts of an NDJSON record the proxy looks at.
#[derive(Debug, Deserialize)]
struct UpstreamRecord {
    /// Kept untyped so a record with an odd `type` can still be terminal.
    #[serde(default, rename = "type")]
    kind: Option<serde_json::Value>,
    #[serde(default)]
    value: Option<serde_json::Value>,
    /// Presence is what matters; `"recordMap": null` still ends the answer.
    #[serde(default, rename = "recordMap", deserialize_with = "present")]
    has_record_map: bool,
}

fn present<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    IgnoredAny::deserialize(deserializer).map(|_| true)
}

/// Classify one trimmed, non-empty NDJSON line.
///
/// # Errors
///
/// Returns the `serde_json` error when the line is not a JSON object.
pub fn decode_line(line: &[u8]) -> Result<UpstreamEvent, serde_json::Error> {
    let record: UpstreamRecord = serde_json::from_slice(line)?;
    if record.has_record_map {
        return Ok(UpstreamEvent::Terminal);
    }
    if record.kind.as_ref().and_then(serde_json::Value::as_str) != Some(MARKDOWN_CHAT) {
        return Ok(UpstreamEvent::Ignored);
    }
    Ok(match record.value {
        Some(serde_json::Value::String(text)) if !text.is_empty() => UpstreamEvent::Fragment(text),
        _ => UpstreamEvent::Ignored,
    })
}
