use std::io::Cursor;

use async_trait::async_trait;
use chunkstream::{DecodeError, DecodedChunk, DecoderFactory, FrameDecoder};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

/// Stateful [`FrameDecoder`] backed by symphonia.
///
/// Each chunk is probed independently (ranges are fetched out of any
/// container context), while the codec decoder itself is kept across
/// chunks and rebuilt only when the codec changes. Inter-chunk history
/// is dropped through [`Decoder::reset`].
pub struct SymphoniaFrameDecoder {
    content_type: String,
    extension: &'static str,
    decoder: Option<Box<dyn Decoder>>,
}

impl SymphoniaFrameDecoder {
    /// Builds a decoder for `content_type`, or
    /// [`DecodeError::Unsupported`] for MIME types symphonia has no
    /// reader for.
    pub fn new(content_type: &str) -> Result<Self, DecodeError> {
        let extension = extension_for(content_type)
            .ok_or_else(|| DecodeError::Unsupported(content_type.to_string()))?;
        Ok(Self {
            content_type: content_type.to_string(),
            extension,
            decoder: None,
        })
    }
}

#[async_trait]
impl FrameDecoder for SymphoniaFrameDecoder {
    async fn ready(&mut self) -> Result<(), DecodeError> {
        // Symphonia needs no async setup; the gate exists for decoders
        // that do (remote or JIT-compiled codecs).
        Ok(())
    }

    async fn decode(&mut self, bytes: &[u8]) -> Result<DecodedChunk, DecodeError> {
        let source = Box::new(Cursor::new(bytes.to_vec()));
        let stream = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        hint.with_extension(self.extension);
        hint.mime_type(&self.content_type);

        let probed = get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Failed(format!("probe failed: {e}")))?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| DecodeError::Failed("no default audio track".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        // Rebuild only on codec change; otherwise keep the instance so
        // reset semantics stay observable across chunks.
        let rebuild = match &self.decoder {
            Some(decoder) => decoder.codec_params().codec != params.codec,
            None => true,
        };
        if rebuild {
            self.decoder = Some(
                get_codecs()
                    .make(&params, &DecoderOptions::default())
                    .map_err(|e| DecodeError::Init(e.to_string()))?,
            );
        }
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(DecodeError::Init("decoder construction yielded nothing".into()));
        };

        let mut sample_rate = params.sample_rate.unwrap_or(0);
        let mut channels: Vec<Vec<f32>> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(DecodeError::Failed(e.to_string())),
            };
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    let mut buf =
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_planar_ref(decoded);
                    accumulate_planar(&mut channels, buf.samples(), spec.channels.count());
                }
                // Corrupt packet (e.g. a range cut mid-frame); the
                // reader resyncs on the next one.
                Err(SymphoniaError::DecodeError(msg)) => {
                    warn!(msg, "skipping undecodable packet");
                }
                Err(e) => return Err(DecodeError::Failed(e.to_string())),
            }
        }

        if channels.is_empty() {
            return Err(DecodeError::Failed("chunk produced no audio frames".into()));
        }
        debug!(
            sample_rate,
            channels = channels.len(),
            frames = channels[0].len(),
            "chunk decoded"
        );
        Ok(DecodedChunk {
            sample_rate,
            channels,
        })
    }

    fn reset_inter_chunk_state(&mut self) {
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.reset();
        }
    }
}

/// [`DecoderFactory`] producing [`SymphoniaFrameDecoder`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoderFactory;

impl SymphoniaDecoderFactory {
    pub fn new() -> Self {
        Self
    }
}

impl DecoderFactory for SymphoniaDecoderFactory {
    fn create(&self, content_type: &str) -> Result<Box<dyn FrameDecoder>, DecodeError> {
        Ok(Box::new(SymphoniaFrameDecoder::new(content_type)?))
    }
}

/// Appends one packet's planar samples to the per-channel buffers.
///
/// The channel layout is pinned by the first packet; a packet that
/// reports fewer channels mid-chunk fills only the channels it carries
/// instead of overrunning the sample slice.
fn accumulate_planar(channels: &mut Vec<Vec<f32>>, samples: &[f32], channel_count: usize) {
    if channel_count == 0 {
        return;
    }
    if channels.is_empty() {
        *channels = vec![Vec::new(); channel_count];
    }
    let frames = samples.len() / channel_count;
    if frames == 0 {
        return;
    }
    for (dst, src) in channels.iter_mut().zip(samples.chunks_exact(frames)) {
        dst.extend_from_slice(src);
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "audio/mpeg" | "audio/mp3" | "audio/mpa" => Some("mp3"),
        "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some("wav"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/ogg" | "application/ogg" => Some("ogg"),
        "audio/aac" => Some("aac"),
        "audio/aiff" | "audio/x-aiff" => Some("aiff"),
        _ => None,
    }
}
