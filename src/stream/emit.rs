//! Consumers of the fragment stream: SSE chunk emission and buffered aggregation.

use std::convert::Infallible;
use std::time::Instant;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::ProxyError;
use crate::observability::{log_request_complete, log_request_failed};
use crate::protocol::error_shapes::openai_stream_error_frame;
use crate::protocol::openai_chat::response_encoder::{
    push_content_chunk_frame, push_stop_chunk_frame, CompletionMeta,
};
use crate::protocol::openai_chat::ChatCompletionResponse;

use super::sse::DONE_FRAME;

/// Counters reported when a response completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub fragments: usize,
    pub chars: usize,
}

impl EmitStats {
    #[inline]
    fn record(&mut self, fragment: &str) {
        self.fragments += 1;
        self.chars += fragment.chars().count();
    }
}

/// Strategy for turning content fragments into a client response.
pub trait FragmentSink {
    type Output;

    /// Consume one fragment, returning bytes to flush to the client right away, if any.
    fn accept(&mut self, fragment: &str) -> Option<Bytes>;

    fn stats(&self) -> EmitStats;

    /// Close a successful response.
    fn finish(self) -> Self::Output;
}

/// Emits one `chat.completion.chunk` frame per fragment.
#[derive(Debug)]
pub struct SseChunkSink {
    meta: CompletionMeta,
    stats: EmitStats,
}

impl SseChunkSink {
    #[must_use]
    pub fn new(meta: CompletionMeta) -> Self {
        Self {
            meta,
            stats: EmitStats::default(),
        }
    }
}

impl FragmentSink for SseChunkSink {
    /// Stop chunk followed by the `[DONE]` sentinel.
    type Output = Bytes;

    fn accept(&mut self, fragment: &str) -> Option<Bytes> {
        self.stats.record(fragment);
        let mut frame = String::with_capacity(160 + fragment.len());
        push_content_chunk_frame(&mut frame, &self.meta, fragment);
        Some(Bytes::from(frame))
    }

    fn stats(&self) -> EmitStats {
        self.stats
    }

    fn finish(self) -> Bytes {
        let mut tail = String::with_capacity(192);
        push_stop_chunk_frame(&mut tail, &self.meta);
        tail.push_str(DONE_FRAME);
        Bytes::from(tail)
    }
}

/// Accumulates every fragment into one buffered response.
#[derive(Debug)]
pub struct BufferedSink {
    meta: CompletionMeta,
    content: String,
    stats: EmitStats,
}

impl BufferedSink {
    #[must_use]
    pub fn new(meta: CompletionMeta) -> Self {
        Self {
            meta,
            content: String::new(),
            stats: EmitStats::default(),
        }
    }

    fn push(&mut self, fragment: &str) {
        self.stats.record(fragment);
        self.content.push_str(fragment);
    }
}

impl FragmentSink for BufferedSink {
    type Output = ChatCompletionResponse;

    fn accept(&mut self, fragment: &str) -> Option<Bytes> {
        self.push(fragment);
        None
    }

    fn stats(&self) -> EmitStats {
        self.stats
    }

    fn finish(self) -> ChatCompletionResponse {
        self.meta.buffered_response(self.content)
    }
}

/// Drive `fragments` into a buffered sink until the stream ends.
///
/// # Errors
///
/// Returns the first error yielded by `fragments`; the accumulated text is dropped.
async fn drain_buffered<F>(
    fragments: F,
    mut sink: BufferedSink,
) -> Result<(ChatCompletionResponse, EmitStats), ProxyError>
where
    F: Stream<Item = Result<String, ProxyError>>,
{
    let mut fragments = std::pin::pin!(fragments);
    while let Some(item) = fragments.next().await {
        sink.push(&item?);
    }
    let stats = sink.stats();
    Ok((sink.finish(), stats))
}

/// Collect a buffered response, logging the outcome.
///
/// # Errors
///
/// Returns [`ProxyError::UpstreamStream`] when the upstream fails mid-read.
pub async fn collect_buffered<F>(
    fragments: F,
    sink: BufferedSink,
    started: Instant,
) -> Result<ChatCompletionResponse, ProxyError>
where
    F: Stream<Item = Result<String, ProxyError>>,
{
    match drain_buffered(fragments, sink).await {
        Ok((response, stats)) => {
            log_request_complete("buffered", stats, started);
            Ok(response)
        }
        Err(err) => {
            log_request_failed("buffered", &err, started);
            Err(err)
        }
    }
}

/// Build the SSE response body from a fragment stream.
///
/// Each fragment is flushed as its own frame. A normal end appends the stop chunk and
/// `[DONE]`; a mid-stream failure appends one error frame and nothing else.
pub fn sse_body_stream<F>(
    fragments: F,
    sink: SseChunkSink,
    started: Instant,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send
where
    F: Stream<Item = Result<String, ProxyError>> + Send + 'static,
{
    futures_util::stream::unfold(
        Some((Box::pin(fragments), sink)),
        move |state| async move {
            let (mut fragments, mut sink) = state?;
            loop {
                match fragments.next().await {
                    Some(Ok(fragment)) => {
                        if let Some(frame) = sink.accept(&fragment) {
                            return Some((Ok(frame), Some((fragments, sink))));
                        }
                    }
                    Some(Err(err)) => {
                        log_request_failed("stream", &err, started);
                        let frame = openai_stream_error_frame(err.category(), &err.to_string());
                        return Some((Ok(Bytes::from(frame)), None));
                    }
                    None => {
                        log_request_complete("stream", sink.stats(), started);
                        return Some((Ok(sink.finish()), None));
                    }
                }
            }
        },
    )
}
