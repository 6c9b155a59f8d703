use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of every chat completion id.
pub(crate) const COMPLETION_ID_PREFIX: &str = "chatcmpl-";

/// Cheap per-process source of unique `chatcmpl-<uuid>` ids.
///
/// A random 128-bit seed is mixed with a counter, then stamped as a version-4 UUID.
pub(crate) struct CompletionIdGenerator {
    seed: u128,
    counter: AtomicU64,
}

impl CompletionIdGenerator {
    #[must_use]
    pub(crate) fn new() -> Self {
        let seed_hi = u128::from(fastrand::u64(..));
        let seed_lo = u128::from(fastrand::u64(..));
        Self {
            seed: (seed_hi << 64) | seed_lo,
            counter: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub(crate) fn next_uuid(&self) -> uuid::Uuid {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let bits = self.seed ^ u128::from(seq);
        uuid::Builder::from_random_bytes(bits.to_be_bytes()).into_uuid()
    }

    #[must_use]
    pub(crate) fn next_completion_id(&self) -> String {
        let mut buf = uuid::Uuid::encode_buffer();
        let uuid = self.next_uuid().hyphenated().encode_lower(&mut buf);
        let mut id = String::with_capacity(COMPLETION_ID_PREFIX.len() + uuid.len());
        id.push_str(COMPLETION_ID_PREFIX);
        id.push_str(uuid);
        id
    }
}
