//! Incremental NDJSON decoding of the Notion inference stream.
//!
//! Bytes are carried over between chunks until a `\n` completes a line, so records split
//! across reads decode exactly as if they had arrived whole.

use std::pin::Pin;

use bytes::{Buf, BytesMut};
use futures_util::Stream;
use memchr::memchr_iter;
use smallvec::SmallVec;

use crate::error::ProxyError;
use crate::protocol::notion::decoder::decode_line;
use crate::protocol::notion::UpstreamEvent;

/// Buffer-and-split state machine over raw upstream bytes.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    carry: BytesMut,
    /// Bytes of `carry` already known to contain no `\n`.
    scan_from: usize,
    terminated: bool,
    skipped_lines: usize,
}

impl NdjsonDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once a `recordMap` record has been seen. Later input is ignored.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of malformed lines dropped so far.
    #[must_use]
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Feed one chunk and append every fragment it completes to `out`.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<String>) {
        if self.terminated || chunk.is_empty() {
            return;
        }

        let outcome = if self.carry.is_empty() {
            // Fast path: decode straight from the chunk and copy only the partial tail.
            let outcome = split_lines(chunk, 0, out);
            if !outcome.terminated {
                self.carry.extend_from_slice(&chunk[outcome.consumed..]);
            }
            outcome
        } else {
            self.carry.extend_from_slice(chunk);
            let outcome = split_lines(&self.carry, self.scan_from, out);
            self.carry.advance(outcome.consumed);
            outcome
        };

        self.skipped_lines += outcome.skipped;
        if outcome.terminated {
            self.terminated = true;
            self.carry.clear();
        }
        self.scan_from = self.carry.len();
    }

    /// Signal end of input. An unterminated trailing line is discarded.
    pub fn finish(&mut self) {
        if !self.carry.is_empty() {
            tracing::trace!(
                bytes = self.carry.len(),
                "discarding unterminated trailing upstream line"
            );
            self.carry.clear();
        }
        self.scan_from = 0;
    }
}

struct SplitOutcome {
    consumed: usize,
    skipped: usize,
    terminated: bool,
}

fn split_lines(data: &[u8], scan_from: usize, out: &mut Vec<String>) -> SplitOutcome {
    let mut outcome = SplitOutcome {
        consumed: 0,
        skipped: 0,
        terminated: false,
    };
    let scan_from = scan_from.min(data.len());

    for rel in memchr_iter(b'\n', &data[scan_from..]) {
        let line_end = scan_from + rel;
        let line = data[outcome.consumed..line_end].trim_ascii();
        outcome.consumed = line_end + 1;
        if line.is_empty() {
            continue;
        }
        match decode_line(line) {
            Ok(UpstreamEvent::Fragment(text)) => out.push(text),
            Ok(UpstreamEvent::Terminal) => {
                outcome.terminated = true;
                return outcome;
            }
            Ok(UpstreamEvent::Ignored) => {}
            Err(e) => {
                outcome.skipped += 1;
                tracing::trace!(error = %e, "skipping malformed upstream line");
            }
        }
    }
    outcome
}

struct PendingFragments {
    items: SmallVec<[String; 8]>,
    head: usize,
}

impl PendingFragments {
    fn new() -> Self {
        Self {
            items: SmallVec::new(),
            head: 0,
        }
    }

    #[inline]
    fn pop_front(&mut self) -> Option<String> {
        if self.head >= self.items.len() {
            return None;
        }
        let item = std::mem::take(&mut self.items[self.head]);
        self.head += 1;
        if self.head == self.items.len() {
            self.items.clear();
            self.head = 0;
        }
        Some(item)
    }

    #[inline]
    fn extend_from_vec(&mut self, parsed: &mut Vec<String>) {
        if !parsed.is_empty() {
            self.items.extend(parsed.drain(..));
        }
    }
}

struct FragmentState<S> {
    upstream: Option<Pin<Box<S>>>,
    decoder: NdjsonDecoder,
    parsed: Vec<String>,
    pending: PendingFragments,
}

/// Turn an upstream byte stream into a stream of content fragments.
///
/// The upstream is dropped as soon as a terminal record arrives or a read fails, which
/// closes the connection. A read failure is yielded once as
/// [`ProxyError::UpstreamStream`] and ends the stream.
pub fn fragment_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, ProxyError>> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    use futures_util::StreamExt;

    let state = FragmentState {
        upstream: Some(Box::pin(byte_stream)),
        decoder: NdjsonDecoder::new(),
        parsed: Vec::with_capacity(8),
        pending: PendingFragments::new(),
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }

            let upstream = state.upstream.as_mut()?;
            let next = upstream.as_mut().next().await;
            match next {
                Some(Ok(bytes)) => {
                    state.decoder.feed_into(&bytes, &mut state.parsed);
                    state.pending.extend_from_vec(&mut state.parsed);
                    if state.decoder.is_terminated() {
                        tracing::debug!("upstream answer complete, closing upstream connection");
                        state.upstream = None;
                    }
                }
                Some(Err(e)) => {
                    state.upstream = None;
                    return Some((Err(ProxyError::UpstreamStream(e.to_string())), state));
                }
                None => {
                    state.decoder.finish();
                    state.upstream = None;
                    if state.decoder.skipped_lines() > 0 {
                        tracing::debug!(
                            skipped = state.decoder.skipped_lines(),
                            "upstream stream contained malformed lines"
                        );
                    }
                }
            }
        }
    })
}
