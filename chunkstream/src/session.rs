use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{RetryAdvance, StreamConfig};
use crate::decode::{DecodedChunk, DecoderFactory, FrameDecoder};
use crate::error::{FetchError, StreamError};
use crate::fetch::RangeFetcher;
use crate::resolve::SizeResolver;

/// Caller-facing result of an `open`/`next_chunk` cycle.
///
/// Cancellation and the transient empty read are expected outcomes of
/// a healthy session, so they live here rather than in
/// [`StreamError`].
#[derive(Debug)]
pub enum ChunkOutcome {
    /// One decoded chunk, owned by the caller.
    Chunk(DecodedChunk),
    /// The byte cursor reached the total size; no fetch was issued (or
    /// the final range was refused by the server).
    EndOfStream,
    /// The session was cancelled while the operation was in flight;
    /// any decoded result was discarded.
    Cancelled,
    /// Transient empty read at the current cursor. The fixed backoff
    /// has already been waited; the caller may call `next_chunk`
    /// again.
    Starved,
}

/// Explicit session state machine.
///
/// `Cancelled` and `Exhausted` are terminal until `reset` returns the
/// session to `Idle`. The byte cursor only exists while streaming, so
/// "cursor valid but stream not open" is unrepresentable.
#[derive(Debug)]
enum Phase {
    Idle,
    Streaming {
        locator: String,
        total: u64,
        cursor: u64,
        prev_chunk_len: u64,
    },
    Exhausted {
        total: u64,
    },
    Cancelled,
}

/// Releases the in-flight flag on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, StreamError> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| StreamError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Progressive chunk acquisition session.
///
/// One `ChunkStream` drives one opened source end to end: it resolves
/// the total size, sequences half-open range fetches, feeds each
/// fetched range through a stateful decoder (resetting inter-chunk
/// decode state after every call) and hands the decoded frames back to
/// the caller. At most one fetch-plus-decode operation is in flight at
/// any time; a second call while one is pending is rejected with
/// [`StreamError::Busy`].
///
/// Sessions are independent: two `ChunkStream`s over two files share
/// no mutable state and may run concurrently.
///
/// # Example
///
/// ```rust,ignore
/// use chunkstream::{ChunkOutcome, ChunkStream, StreamConfig};
///
/// let session = ChunkStream::new(resolver, fetcher, factory);
/// let first = session.open("http://host/track.mp3", "/music/track.mp3", "audio/mpeg").await?;
/// loop {
///     match session.next_chunk().await? {
///         ChunkOutcome::Chunk(chunk) => play(chunk),
///         ChunkOutcome::Starved => continue,
///         ChunkOutcome::EndOfStream | ChunkOutcome::Cancelled => break,
///     }
/// }
/// ```
pub struct ChunkStream {
    resolver: Arc<dyn SizeResolver>,
    fetcher: Arc<dyn RangeFetcher>,
    factory: Arc<dyn DecoderFactory>,
    config: StreamConfig,
    /// Decoder handle, lazily built and keyed by content type.
    decoder: tokio::sync::Mutex<Option<(String, Box<dyn FrameDecoder>)>>,
    phase: Mutex<Phase>,
    in_flight: AtomicBool,
    /// Soft counter of transient empty reads; retry policy itself
    /// stays with the caller.
    retry_attempts: AtomicU64,
    /// Replaced wholesale on `reset` so a cancelled backoff sleep can
    /// never resume and deliver.
    cancel_token: Mutex<CancellationToken>,
}

impl ChunkStream {
    pub fn new(
        resolver: Arc<dyn SizeResolver>,
        fetcher: Arc<dyn RangeFetcher>,
        factory: Arc<dyn DecoderFactory>,
    ) -> Self {
        Self::with_config(resolver, fetcher, factory, StreamConfig::default())
    }

    pub fn with_config(
        resolver: Arc<dyn SizeResolver>,
        fetcher: Arc<dyn RangeFetcher>,
        factory: Arc<dyn DecoderFactory>,
        config: StreamConfig,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            factory,
            config,
            decoder: tokio::sync::Mutex::new(None),
            phase: Mutex::new(Phase::Idle),
            in_flight: AtomicBool::new(false),
            retry_attempts: AtomicU64::new(0),
            cancel_token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Opens the session: resolves the total size of `path`, prepares
    /// a decoder for `content_type` and issues the first fetch of
    /// [`StreamConfig::first_chunk_size`] bytes against `locator`.
    ///
    /// Returns the first decoded chunk. Fails with
    /// [`StreamError::Resolution`] or [`StreamError::DecoderInit`]
    /// without leaving a partial session behind: on failure the
    /// session is still `Idle` and reusable. Calling `open` on a
    /// session that is not idle fails with [`StreamError::Busy`];
    /// `reset` first.
    pub async fn open(
        &self,
        locator: &str,
        path: &str,
        content_type: &str,
    ) -> Result<ChunkOutcome, StreamError> {
        // Held across every suspension point below, so a concurrent
        // open or next_chunk is rejected instead of interleaving with
        // the resolver/decoder awaits.
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        if !matches!(*self.lock_phase(), Phase::Idle) {
            return Err(StreamError::Busy);
        }

        debug!(path, content_type, "opening chunk stream");
        let total = self
            .resolver
            .total_size(path)
            .await
            .map_err(StreamError::Resolution)?;

        self.ensure_decoder(content_type).await?;

        *self.lock_phase() = Phase::Streaming {
            locator: locator.to_string(),
            total,
            cursor: 0,
            prev_chunk_len: 0,
        };
        debug!(total, "size resolved, issuing first fetch");

        match self.fetch_decode_inner(self.config.first_chunk_size).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // Open failures abort stream creation entirely; a
                // concurrent cancel/reset outcome is left alone.
                let mut phase = self.lock_phase();
                if matches!(*phase, Phase::Streaming { .. }) {
                    *phase = Phase::Idle;
                }
                Err(err)
            }
        }
    }

    /// Fetches and decodes the next chunk of
    /// [`StreamConfig::chunk_size`] bytes.
    pub async fn next_chunk(&self) -> Result<ChunkOutcome, StreamError> {
        self.fetch_decode(self.config.chunk_size).await
    }

    /// Fetches and decodes the next chunk of an explicit byte size.
    pub async fn next_chunk_sized(&self, size: u64) -> Result<ChunkOutcome, StreamError> {
        self.fetch_decode(size).await
    }

    /// Marks the session cancelled. Cooperative: an in-flight fetch is
    /// not aborted, but its result is discarded and delivered as
    /// [`ChunkOutcome::Cancelled`]. A pending backoff sleep wakes
    /// immediately.
    pub fn cancel(&self) {
        let mut phase = self.lock_phase();
        if !matches!(*phase, Phase::Idle) {
            debug!("cancelling chunk stream");
            *phase = Phase::Cancelled;
        }
        drop(phase);
        self.lock_token().cancel();
    }

    /// Cancels, then returns the session to `Idle`: cursor, total size
    /// and retry counter cleared, decoder inter-chunk state reset. The
    /// session is reusable for a new `open`; the decoder handle is
    /// kept and reused if the content type matches.
    pub async fn reset(&self) {
        self.cancel();
        {
            let mut token = self.lock_token();
            *token = CancellationToken::new();
        }
        self.retry_attempts.store(0, Ordering::Relaxed);
        if let Some((_, decoder)) = self.decoder.lock().await.as_mut() {
            decoder.reset_inter_chunk_state();
        }
        *self.lock_phase() = Phase::Idle;
    }

    /// Total size in bytes, once resolved.
    pub fn total_size(&self) -> Option<u64> {
        match *self.lock_phase() {
            Phase::Streaming { total, .. } | Phase::Exhausted { total } => Some(total),
            _ => None,
        }
    }

    /// Current byte cursor while streaming.
    pub fn cursor(&self) -> Option<u64> {
        match *self.lock_phase() {
            Phase::Streaming { cursor, .. } => Some(cursor),
            _ => None,
        }
    }

    /// Server-reported length of the previous chunk's read.
    pub fn prev_chunk_len(&self) -> Option<u64> {
        match *self.lock_phase() {
            Phase::Streaming { prev_chunk_len, .. } => Some(prev_chunk_len),
            _ => None,
        }
    }

    /// Number of transient empty reads observed since open/reset.
    pub fn retry_attempts(&self) -> u64 {
        self.retry_attempts.load(Ordering::Relaxed)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(*self.lock_phase(), Phase::Exhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self.lock_phase(), Phase::Cancelled)
    }

    pub fn is_open(&self) -> bool {
        matches!(
            *self.lock_phase(),
            Phase::Streaming { .. } | Phase::Exhausted { .. }
        )
    }

    /// One full fetch-plus-decode cycle over `[cursor, cursor+size)`.
    async fn fetch_decode(&self, size: u64) -> Result<ChunkOutcome, StreamError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        self.fetch_decode_inner(size).await
    }

    /// The cycle body; the caller must hold the in-flight guard.
    async fn fetch_decode_inner(&self, size: u64) -> Result<ChunkOutcome, StreamError> {
        let token = self.lock_token().clone();

        let (locator, total, cursor) = match &*self.lock_phase() {
            Phase::Idle => return Err(StreamError::NotOpen),
            Phase::Cancelled => return Ok(ChunkOutcome::Cancelled),
            Phase::Exhausted { .. } => return Ok(ChunkOutcome::EndOfStream),
            Phase::Streaming {
                locator,
                total,
                cursor,
                ..
            } => (locator.clone(), *total, *cursor),
        };

        if cursor >= total {
            *self.lock_phase() = Phase::Exhausted { total };
            return Ok(ChunkOutcome::EndOfStream);
        }

        let end = total.min(cursor + size);
        debug!(start = cursor, end, total, "fetching range");

        let fetched = match self.fetcher.fetch_range(&locator, cursor, end).await {
            Ok(fetched) => fetched,
            Err(FetchError::Status(code)) if end == total => {
                // The final range was refused; nothing left to stream.
                warn!(code, "non-success response at stream boundary, marking exhausted");
                *self.lock_phase() = Phase::Exhausted { total };
                return Ok(ChunkOutcome::EndOfStream);
            }
            Err(err) => return Err(err.into()),
        };

        if token.is_cancelled() {
            return Ok(ChunkOutcome::Cancelled);
        }

        let Some(body) = fetched.body else {
            return self.backoff_after_empty_read(&token, total).await;
        };

        let decoded = {
            let mut slot = self.decoder.lock().await;
            let Some((_, decoder)) = slot.as_mut() else {
                return Err(StreamError::NotOpen);
            };
            let decoded = decoder
                .decode(&body)
                .await
                .map_err(StreamError::Decode)?;
            // Drop codec history right away so the next independently
            // fetched range starts from a clean decoder.
            decoder.reset_inter_chunk_state();
            decoded
        };

        // Re-check this operation's own token: a reset during the
        // decode cancelled it and swapped in a fresh session token, so
        // the phase alone cannot tell a stale result from a live one.
        if token.is_cancelled() {
            return Ok(ChunkOutcome::Cancelled);
        }

        // The cancelled check happens immediately before delivery: a
        // cancelled session never hands out a decoded chunk.
        let mut phase = self.lock_phase();
        match &mut *phase {
            Phase::Streaming {
                cursor,
                prev_chunk_len,
                ..
            } => {
                *cursor = end;
                *prev_chunk_len = fetched.content_length;
            }
            _ => return Ok(ChunkOutcome::Cancelled),
        }
        if end == total {
            debug!(total, "reached end of stream");
            *phase = Phase::Exhausted { total };
        }
        drop(phase);

        debug!(
            frames = decoded.frames(),
            sample_rate = decoded.sample_rate,
            "chunk decoded"
        );
        Ok(ChunkOutcome::Chunk(decoded))
    }

    /// Waits out the fixed empty-read backoff (cancellable) and applies
    /// the configured cursor policy. No decode call is issued.
    async fn backoff_after_empty_read(
        &self,
        token: &CancellationToken,
        total: u64,
    ) -> Result<ChunkOutcome, StreamError> {
        let attempt = self.retry_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(attempt, "empty read, backing off");

        tokio::select! {
            () = tokio::time::sleep(self.config.empty_read_backoff) => {}
            () = token.cancelled() => return Ok(ChunkOutcome::Cancelled),
        }

        if let RetryAdvance::SkipBytes(skip) = self.config.retry_advance {
            if let Phase::Streaming { cursor, .. } = &mut *self.lock_phase() {
                *cursor = total.min(*cursor + skip);
            }
        }
        Ok(ChunkOutcome::Starved)
    }

    /// Builds the decoder for `content_type` if the cached handle does
    /// not match, then awaits its init gate.
    async fn ensure_decoder(&self, content_type: &str) -> Result<(), StreamError> {
        let mut slot = self.decoder.lock().await;
        match slot.as_mut() {
            Some((cached_type, decoder)) if cached_type == content_type => {
                decoder.ready().await.map_err(StreamError::DecoderInit)?;
            }
            _ => {
                let mut decoder = self
                    .factory
                    .create(content_type)
                    .map_err(StreamError::DecoderInit)?;
                decoder.ready().await.map_err(StreamError::DecoderInit)?;
                *slot = Some((content_type.to_string(), decoder));
            }
        }
        Ok(())
    }

    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_token(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
