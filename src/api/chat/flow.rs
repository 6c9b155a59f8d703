use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderMap;
use axum::response::Response;
use tracing::{debug, info};

use crate::error::ProxyError;
use crate::observability::log_request_failed;
use crate::protocol::notion::encoder::{build_envelope, build_transcript};
use crate::protocol::openai_chat::response_encoder::CompletionMeta;
use crate::protocol::openai_chat::ChatCompletionRequest;
use crate::state::AppState;
use crate::stream::fragment_stream;

use super::io::{buffered_response, streaming_response};

/// Authenticate, validate, translate, call the backend once, then hand the body to an emitter.
pub(super) async fn handler_inner(
    state: Arc<AppState>,
    headers: HeaderMap,
    body: bytes::Bytes,
) -> Result<Response, ProxyError> {
    state.authenticate(&headers)?;
    if !state.config.has_notion_cookie() {
        return Err(ProxyError::Config("Notion cookie is not set".to_string()));
    }

    let request = ChatCompletionRequest::from_json_slice(&body, state.request_defaults())?;
    let mode = if request.stream { "stream" } else { "buffered" };
    info!(
        model = %request.model,
        notion_model = %request.notion_model,
        mode,
        messages = request.messages.len(),
        "chat completion request"
    );

    let transcript = build_transcript(&request.messages, &request.notion_model);
    let envelope = build_envelope(&state.config.notion.space_id, transcript);
    debug!(trace_id = %envelope.trace_id, "sending inference transcript");
    let upstream_body = serde_json::to_vec(&envelope)
        .map_err(|e| ProxyError::Internal(format!("Failed to encode upstream request: {e}")))?;

    let started = Instant::now();
    let upstream_response = match state
        .transport
        .send_stream(state.upstream.url(), state.upstream.headers(), upstream_body.into())
        .await
    {
        Ok(response) => response,
        Err(err) => {
            log_request_failed(mode, &err, started);
            return Err(err);
        }
    };

    let fragments = fragment_stream(upstream_response.bytes_stream());
    let meta = CompletionMeta::new(state.next_completion_id(), request.model);
    if request.stream {
        Ok(streaming_response(fragments, meta, started))
    } else {
        buffered_response(fragments, meta, started).await
    }
}
