use async_trait::async_trait;

use crate::error::DecodeError;

/// Decoded audio frames for one chunk.
///
/// Handed to the caller by value; the controller keeps no reference to
/// it after delivery.
#[derive(Debug, Clone)]
pub struct DecodedChunk {
    /// Sample rate of the decoded frames, in Hz.
    pub sample_rate: u32,
    /// Planar sample buffers, one `Vec<f32>` per channel.
    pub channels: Vec<Vec<f32>>,
}

impl DecodedChunk {
    /// Number of sample frames in the chunk (per-channel length).
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

/// Stateful streaming decoder for one content type.
///
/// A single instance is reused across all chunks of a session. Codecs
/// carry history between calls (bit reservoir, filter state); because
/// each chunk is fetched independently, the controller calls
/// [`reset_inter_chunk_state`](FrameDecoder::reset_inter_chunk_state)
/// after every decode so that state never bleeds into the next chunk.
#[async_trait]
pub trait FrameDecoder: Send {
    /// Async init gate. Must complete before the first decode; called
    /// by the controller during `open`. Implementations with no async
    /// setup return immediately.
    async fn ready(&mut self) -> Result<(), DecodeError>;

    /// Decodes one chunk's raw encoded bytes into sample frames.
    async fn decode(&mut self, bytes: &[u8]) -> Result<DecodedChunk, DecodeError>;

    /// Discards codec history carried over from the previous decode.
    fn reset_inter_chunk_state(&mut self);
}

/// Constructs decoders keyed by content type.
///
/// The controller builds at most one decoder per content type and
/// reuses it across `reset`/`open` cycles for the same type.
pub trait DecoderFactory: Send + Sync {
    /// Builds a decoder for `content_type`, or
    /// [`DecodeError::Unsupported`] if the type has no codec.
    fn create(&self, content_type: &str) -> Result<Box<dyn FrameDecoder>, DecodeError>;
}
