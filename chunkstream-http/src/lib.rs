//! # chunkstream-http
//!
//! Concrete collaborators for [`chunkstream`]:
//!
//! - [`HttpRangeFetcher`] — `reqwest`-based [`chunkstream::RangeFetcher`]
//!   issuing HTTP range requests.
//! - [`FsSizeResolver`] / [`HttpSizeResolver`] —
//!   [`chunkstream::SizeResolver`]s over the local filesystem and over
//!   an HTTP `HEAD` request.
//! - [`SymphoniaFrameDecoder`] / [`SymphoniaDecoderFactory`] — a
//!   stateful [`chunkstream::FrameDecoder`] backed by symphonia, with
//!   explicit inter-chunk state reset.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chunkstream::ChunkStream;
//! use chunkstream_http::{FsSizeResolver, HttpRangeFetcher, SymphoniaDecoderFactory};
//!
//! let session = ChunkStream::new(
//!     Arc::new(FsSizeResolver::new()),
//!     Arc::new(HttpRangeFetcher::new()),
//!     Arc::new(SymphoniaDecoderFactory::new()),
//! );
//! ```

mod decoder;
mod fetcher;
mod size;

pub use decoder::{SymphoniaDecoderFactory, SymphoniaFrameDecoder};
pub use fetcher::HttpRangeFetcher;
pub use size::{FsSizeResolver, HttpSizeResolver};
