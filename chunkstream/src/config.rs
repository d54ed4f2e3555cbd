use std::time::Duration;

/// Default size of the first fetch (100 kB): small, so playback can
/// start before the steady-state chunks arrive.
pub const DEFAULT_FIRST_CHUNK_SIZE: u64 = 100 * 1000;

/// Default steady-state chunk size (512 kB).
pub const DEFAULT_CHUNK_SIZE: u64 = 512 * 1000;

/// Default wait after a transient empty read.
pub const DEFAULT_EMPTY_READ_BACKOFF: Duration = Duration::from_millis(3000);

/// Cursor policy after an empty-read backoff.
///
/// The retry policy is an explicit parameter rather than a baked-in
/// behavior, so callers can observe and test it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAdvance {
    /// Retry the same byte range (default).
    SameRange,
    /// Skip forward by up to `n` bytes before retrying, capped at the
    /// total size.
    SkipBytes(u64),
}

/// Tuning knobs for a [`ChunkStream`](crate::ChunkStream) session.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Byte size of the initial fetch issued by `open`.
    pub first_chunk_size: u64,
    /// Byte size of steady-state fetches.
    pub chunk_size: u64,
    /// Fixed wait applied after a transient empty read.
    pub empty_read_backoff: Duration,
    /// Cursor policy after the backoff.
    pub retry_advance: RetryAdvance,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            first_chunk_size: DEFAULT_FIRST_CHUNK_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            empty_read_backoff: DEFAULT_EMPTY_READ_BACKOFF,
            retry_advance: RetryAdvance::SameRange,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_chunk_size(mut self, bytes: u64) -> Self {
        self.first_chunk_size = bytes;
        self
    }

    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn with_empty_read_backoff(mut self, backoff: Duration) -> Self {
        self.empty_read_backoff = backoff;
        self
    }

    pub fn with_retry_advance(mut self, policy: RetryAdvance) -> Self {
        self.retry_advance = policy;
        self
    }
}
