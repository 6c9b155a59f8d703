use std::time::Instant;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::Stream;

use crate::error::ProxyError;
use crate::protocol::openai_chat::response_encoder::CompletionMeta;
use crate::stream::emit::{collect_buffered, sse_body_stream};
use crate::stream::{BufferedSink, SseChunkSink};

#[inline]
fn sse_ok_response(body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}

pub(super) fn streaming_response<F>(fragments: F, meta: CompletionMeta, started: Instant) -> Response
where
    F: Stream<Item = Result<String, ProxyError>> + Send + 'static,
{
    let body = sse_body_stream(fragments, SseChunkSink::new(meta), started);
    sse_ok_response(Body::from_stream(body))
}

pub(super) async fn buffered_response<F>(
    fragments: F,
    meta: CompletionMeta,
    started: Instant,
) -> Result<Response, ProxyError>
where
    F: Stream<Item = Result<String, ProxyError>>,
{
    let response = collect_buffered(fragments, BufferedSink::new(meta), started).await?;
    Ok(Json(response).into_response())
}
