use async_trait::async_trait;
use chunkstream::{SizeError, SizeResolver};
use reqwest::StatusCode;
use tracing::debug;

/// [`SizeResolver`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSizeResolver;

impl FsSizeResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SizeResolver for FsSizeResolver {
    async fn total_size(&self, path: &str) -> Result<u64, SizeError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SizeError::NotFound(path.to_string())
            } else {
                SizeError::Io(e.to_string())
            }
        })?;
        debug!(path, size = metadata.len(), "resolved file size");
        Ok(metadata.len())
    }
}

/// [`SizeResolver`] using an HTTP `HEAD` request.
///
/// The resource must answer with a `Content-Length` header; servers
/// that stream without one cannot be range-addressed anyway.
#[derive(Debug, Clone, Default)]
pub struct HttpSizeResolver {
    client: reqwest::Client,
}

impl HttpSizeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SizeResolver for HttpSizeResolver {
    async fn total_size(&self, path: &str) -> Result<u64, SizeError> {
        let response = self
            .client
            .head(path)
            .send()
            .await
            .map_err(|e| SizeError::Io(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SizeError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(SizeError::Io(format!(
                "HEAD {path} returned HTTP status {status}"
            )));
        }

        let size = response
            .content_length()
            .ok_or_else(|| SizeError::Io(format!("HEAD {path} returned no Content-Length")))?;
        debug!(path, size, "resolved remote size");
        Ok(size)
    }
}
