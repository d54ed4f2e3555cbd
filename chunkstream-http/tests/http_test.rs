//! HTTP adapter tests against a wiremock server.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chunkstream::{
    ChunkOutcome, ChunkStream, DecodeError, DecodedChunk, DecoderFactory, FetchError,
    FrameDecoder, RangeFetcher, SizeError, SizeResolver, StreamConfig,
};
use chunkstream_http::{FsSizeResolver, HttpRangeFetcher, HttpSizeResolver};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `RUST_LOG=chunkstream=debug cargo test` shows the controller's
/// fetch/decode trace.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// ─── Range fetcher ─────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_range_sends_inclusive_range_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/track.mp3"))
        .and(header("range", "bytes=100-611"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![7u8; 512]))
        .mount(&server)
        .await;

    let fetcher = HttpRangeFetcher::new();
    let url = format!("{}/track.mp3", server.uri());
    let fetched = fetcher.fetch_range(&url, 100, 612).await.unwrap();

    assert_eq!(fetched.content_length, 512);
    assert_eq!(fetched.body.unwrap().len(), 512);
}

#[tokio::test]
async fn fetch_range_maps_non_success_to_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpRangeFetcher::new();
    let url = format!("{}/missing.mp3", server.uri());
    let err = fetcher.fetch_range(&url, 0, 100).await.unwrap_err();
    assert!(matches!(err, FetchError::Status(404)));
}

#[tokio::test]
async fn empty_success_body_is_a_transient_read() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/track.mp3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let fetcher = HttpRangeFetcher::new();
    let url = format!("{}/track.mp3", server.uri());
    let fetched = fetcher.fetch_range(&url, 0, 100).await.unwrap();
    assert!(fetched.body.is_none());
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let fetcher = HttpRangeFetcher::new();
    let err = fetcher
        .fetch_range("http://127.0.0.1:1/track.mp3", 0, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

// ─── Size resolvers ────────────────────────────────────────────────────────

#[tokio::test]
async fn fs_resolver_returns_file_length() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), vec![0u8; 1234]).unwrap();

    let resolver = FsSizeResolver::new();
    let size = resolver
        .total_size(file.path().to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(size, 1234);
}

#[tokio::test]
async fn fs_resolver_maps_missing_file_to_not_found() {
    let resolver = FsSizeResolver::new();
    let err = resolver
        .total_size("/nonexistent/dir/track.mp3")
        .await
        .unwrap_err();
    assert!(matches!(err, SizeError::NotFound(_)));
}

#[tokio::test]
async fn http_resolver_reads_content_length_from_head() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/track.mp3"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", "5000"))
        .mount(&server)
        .await;

    let resolver = HttpSizeResolver::new();
    let url = format!("{}/track.mp3", server.uri());
    assert_eq!(resolver.total_size(&url).await.unwrap(), 5000);
}

#[tokio::test]
async fn http_resolver_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/missing.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = HttpSizeResolver::new();
    let url = format!("{}/missing.mp3", server.uri());
    let err = resolver.total_size(&url).await.unwrap_err();
    assert!(matches!(err, SizeError::NotFound(_)));
}

// ─── Controller over real HTTP adapters ────────────────────────────────────

struct CountingDecoder {
    decodes: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameDecoder for CountingDecoder {
    async fn ready(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    async fn decode(&mut self, bytes: &[u8]) -> Result<DecodedChunk, DecodeError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(DecodedChunk {
            sample_rate: 44_100,
            channels: vec![bytes.iter().map(|b| f32::from(*b) / 255.0).collect()],
        })
    }

    fn reset_inter_chunk_state(&mut self) {}
}

struct CountingFactory {
    decodes: Arc<AtomicUsize>,
}

impl DecoderFactory for CountingFactory {
    fn create(&self, _content_type: &str) -> Result<Box<dyn FrameDecoder>, DecodeError> {
        Ok(Box::new(CountingDecoder {
            decodes: self.decodes.clone(),
        }))
    }
}

#[tokio::test]
async fn session_streams_a_remote_file_to_exhaustion() {
    init_tracing();
    let server = MockServer::start().await;
    let file: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();

    Mock::given(method("HEAD"))
        .and(path("/track.mp3"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-length", "1000"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/track.mp3"))
        .and(header("range", "bytes=0-99"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(file[0..100].to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/track.mp3"))
        .and(header("range", "bytes=100-499"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(file[100..500].to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/track.mp3"))
        .and(header("range", "bytes=500-999"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(file[500..1000].to_vec()))
        .mount(&server)
        .await;

    let decodes = Arc::new(AtomicUsize::new(0));
    let url = format!("{}/track.mp3", server.uri());
    let config = StreamConfig::new()
        .with_first_chunk_size(100)
        .with_chunk_size(400);
    let session = ChunkStream::with_config(
        Arc::new(HttpSizeResolver::new()),
        Arc::new(HttpRangeFetcher::new()),
        Arc::new(CountingFactory {
            decodes: decodes.clone(),
        }),
        config,
    );

    let first = session.open(&url, &url, "audio/mpeg").await.unwrap();
    match first {
        ChunkOutcome::Chunk(chunk) => assert_eq!(chunk.frames(), 100),
        other => panic!("expected first chunk, got {other:?}"),
    }

    assert!(matches!(
        session.next_chunk().await.unwrap(),
        ChunkOutcome::Chunk(_)
    ));
    assert!(matches!(
        session.next_chunk().await.unwrap(),
        ChunkOutcome::Chunk(_)
    ));
    assert!(session.is_exhausted());
    assert!(matches!(
        session.next_chunk().await.unwrap(),
        ChunkOutcome::EndOfStream
    ));
    assert_eq!(decodes.load(Ordering::SeqCst), 3);
}
