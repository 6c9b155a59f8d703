pub mod emit;
pub mod ndjson;
pub mod sse;

pub use emit::{BufferedSink, EmitStats, FragmentSink, SseChunkSink};
pub use ndjson::{fragment_stream, NdjsonDecoder};
