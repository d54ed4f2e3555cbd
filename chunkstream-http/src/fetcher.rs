use async_trait::async_trait;
use chunkstream::{FetchError, FetchedRange, RangeFetcher};
use reqwest::header::RANGE;
use tracing::debug;

/// [`RangeFetcher`] over HTTP range requests.
///
/// The half-open interval `[start, end)` maps onto HTTP's inclusive
/// `Range: bytes=start-(end-1)` header. Any 2xx answer counts as a
/// successful read, including a plain 200 from servers that ignore the
/// range header; everything else surfaces as [`FetchError::Status`].
#[derive(Debug, Clone, Default)]
pub struct HttpRangeFetcher {
    client: reqwest::Client,
}

impl HttpRangeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a caller-configured client (timeouts, proxies, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RangeFetcher for HttpRangeFetcher {
    async fn fetch_range(
        &self,
        locator: &str,
        start: u64,
        end: u64,
    ) -> Result<FetchedRange, FetchError> {
        let last = end.saturating_sub(1);
        let response = self
            .client
            .get(locator)
            .header(RANGE, format!("bytes={start}-{last}"))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let reported = response.content_length();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let content_length = reported.unwrap_or(body.len() as u64);
        debug!(locator, start, end, content_length, "range fetched");

        Ok(FetchedRange {
            content_length,
            body: (!body.is_empty()).then_some(body),
        })
    }
}
