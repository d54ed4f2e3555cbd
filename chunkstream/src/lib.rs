//! # chunkstream
//!
//! Progressive chunked audio acquisition.
//!
//! This crate fetches an audio file incrementally from any byte-range
//! addressable source, decodes each fetched range into playable sample
//! frames and exposes the result as a restartable, cancellable
//! sequence of decoded chunks. The whole file is never held in memory
//! and the caller is never blocked while I/O is in flight.
//!
//! ## Features
//!
//! - **Trait seams**: the size lookup ([`SizeResolver`]), the range
//!   transport ([`RangeFetcher`]) and the codec ([`FrameDecoder`]) are
//!   collaborator traits, so the core is portable across hosting
//!   environments. HTTP and symphonia adapters live in the companion
//!   `chunkstream-http` crate.
//! - **Strict ordering**: the byte cursor is monotonic and at most one
//!   fetch-plus-decode operation is in flight per session, enforced by
//!   a scoped guard rather than ad hoc flag juggling.
//! - **Cooperative cancellation**: cancelling never aborts an in-flight
//!   read, it suppresses delivery of the eventual result; a cancelled
//!   session never hands out a decoded chunk.
//! - **Visible retry policy**: a transient empty read triggers a fixed,
//!   cancellable backoff and a soft attempt counter; whether to retry
//!   the same range or skip forward is an explicit, testable
//!   [`RetryAdvance`] parameter.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chunkstream::{ChunkOutcome, ChunkStream};
//! use chunkstream_http::{HttpRangeFetcher, FsSizeResolver, SymphoniaDecoderFactory};
//!
//! let session = ChunkStream::new(
//!     Arc::new(FsSizeResolver::new()),
//!     Arc::new(HttpRangeFetcher::new()),
//!     Arc::new(SymphoniaDecoderFactory::new()),
//! );
//!
//! let first = session
//!     .open("http://localhost/track.mp3", "/music/track.mp3", "audio/mpeg")
//!     .await?;
//! while let ChunkOutcome::Chunk(chunk) = session.next_chunk().await? {
//!     println!("{} frames at {} Hz", chunk.frames(), chunk.sample_rate);
//! }
//! ```

mod config;
mod decode;
mod error;
mod fetch;
mod resolve;
mod session;

pub use config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_EMPTY_READ_BACKOFF, DEFAULT_FIRST_CHUNK_SIZE, RetryAdvance,
    StreamConfig,
};
pub use decode::{DecodedChunk, DecoderFactory, FrameDecoder};
pub use error::{DecodeError, FetchError, SizeError, StreamError};
pub use fetch::{FetchedRange, RangeFetcher};
pub use resolve::SizeResolver;
pub use session::{ChunkOutcome, ChunkStream};
