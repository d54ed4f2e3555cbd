/// Size Resolver failures.
#[derive(Debug, thiserror::Error)]
pub enum SizeError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("size lookup failed: {0}")]
    Io(String),
}

/// Range Fetcher failures.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("range request returned HTTP status {0}")]
    Status(u16),
    #[error("range request failed: {0}")]
    Transport(String),
}

/// Frame Decoder failures.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("decoder initialization failed: {0}")]
    Init(String),
    #[error("chunk decode failed: {0}")]
    Failed(String),
    #[error("unsupported content type: {0}")]
    Unsupported(String),
}

/// Errors surfaced by [`ChunkStream`](crate::ChunkStream) operations.
///
/// Cancellation and the transient empty read are deliberately absent:
/// they are expected outcomes, reported through
/// [`ChunkOutcome`](crate::ChunkOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Size lookup failed; fatal to `open`, the session stays idle.
    #[error("size resolution failed: {0}")]
    Resolution(#[source] SizeError),
    /// Decoder construction or its init gate failed; fatal to `open`.
    #[error("decoder initialization failed: {0}")]
    DecoderInit(#[source] DecodeError),
    /// Non-success range response away from the stream boundary.
    /// The cursor is unchanged, the same range may be retried.
    #[error("range fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// Decode failure. The cursor is unchanged, the same range may be
    /// retried.
    #[error("chunk decode failed: {0}")]
    Decode(#[source] DecodeError),
    /// A fetch-plus-decode operation is already in flight on this
    /// session, or `open` was called on a session that is not idle.
    #[error("another operation is already in flight")]
    Busy,
    /// `next_chunk` was called before a successful `open`.
    #[error("session is not open")]
    NotOpen,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_carries_source() {
        let err = StreamError::Resolution(SizeError::NotFound("/music/a.mp3".into()));
        let msg = err.to_string();
        assert!(msg.contains("size resolution failed"));
        assert!(msg.contains("/music/a.mp3"));
    }

    #[test]
    fn fetch_error_converts_into_stream_error() {
        let err: StreamError = FetchError::Status(503).into();
        assert!(matches!(err, StreamError::Fetch(FetchError::Status(503))));
    }
}
