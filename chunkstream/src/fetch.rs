use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Result of one successful range read.
#[derive(Debug, Clone)]
pub struct FetchedRange {
    /// Length of the read as reported by the server (`Content-Length`).
    pub content_length: u64,
    /// Raw encoded bytes of the range. `None` models a transient empty
    /// read: the request succeeded but the server returned no body at
    /// the current cursor. The controller answers that with a backoff,
    /// not an error.
    pub body: Option<Bytes>,
}

/// Performs one byte-range read against a locator.
///
/// Ranges are half-open `[start, end)`. A non-2xx response surfaces as
/// [`FetchError::Status`]; transport-level failures as
/// [`FetchError::Transport`].
#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Fetches the bytes in `[start, end)` of the resource at `locator`.
    async fn fetch_range(
        &self,
        locator: &str,
        start: u64,
        end: u64,
    ) -> Result<FetchedRange, FetchError>;
}
