use std::io::Cursor;
use std::path::Path;

use libpcmz::{wav, CodecError, CodecResult, ExtractedPcm, Transcoder, WavTranscoder};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Decoded audio as interleaved 16-bit samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    /// codec the samples were decoded from, e.g. "FLAC", "WAV"
    pub source_format: String,
}

/// Read any symphonia-supported audio file into interleaved i16
pub fn read_audio_file(path: &Path) -> CodecResult<DecodedAudio> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    read_from_source(mss, path.extension().and_then(|e| e.to_str()))
}

/// Read audio from bytes already in memory
pub fn read_audio_from_bytes(bytes: &[u8]) -> CodecResult<DecodedAudio> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
    read_from_source(mss, None)
}

fn read_from_source(mss: MediaSourceStream, extension: Option<&str>) -> CodecResult<DecodedAudio> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| CodecError::UnsupportedFormat(format!("unrecognised audio input: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| CodecError::UnsupportedFormat("no audio track found".to_string()))?;

    let source_format = codec_name(track.codec_params.codec).to_string();
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CodecError::UnsupportedFormat(format!("no decoder for track: {}", e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(decode_error("reading packet", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!(%msg, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_error("decoding packet", e)),
        };

        let spec = decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        append_samples(&decoded, &mut samples);
    }

    let sample_rate = sample_rate
        .ok_or_else(|| CodecError::UnsupportedFormat("unknown sample rate".to_string()))?;
    let channels = channels
        .ok_or_else(|| CodecError::UnsupportedFormat("unknown channel count".to_string()))?;

    debug!(
        samples = samples.len(),
        sample_rate,
        channels,
        source = %source_format,
        "decoded audio input"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
        source_format,
    })
}

fn decode_error(phase: &str, err: SymphoniaError) -> CodecError {
    match err {
        SymphoniaError::IoError(e) => CodecError::Io(e),
        other => CodecError::UnsupportedFormat(format!("{}: {}", phase, other)),
    }
}

fn codec_name(codec: symphonia::core::codecs::CodecType) -> &'static str {
    use symphonia::core::codecs::*;
    match codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE | CODEC_TYPE_PCM_S24LE
        | CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_U8 | CODEC_TYPE_PCM_F32LE => "WAV",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_VORBIS => "OGG",
        CODEC_TYPE_AAC => "AAC",
        _ => "UNKNOWN",
    }
}

fn append_samples(buffer: &AudioBufferRef, samples: &mut Vec<i16>) {
    match buffer {
        AudioBufferRef::U8(buf) => interleave(&**buf, samples),
        AudioBufferRef::U16(buf) => interleave(&**buf, samples),
        AudioBufferRef::U24(buf) => interleave(&**buf, samples),
        AudioBufferRef::U32(buf) => interleave(&**buf, samples),
        AudioBufferRef::S8(buf) => interleave(&**buf, samples),
        AudioBufferRef::S16(buf) => interleave(&**buf, samples),
        AudioBufferRef::S24(buf) => interleave(&**buf, samples),
        AudioBufferRef::S32(buf) => interleave(&**buf, samples),
        AudioBufferRef::F32(buf) => interleave(&**buf, samples),
        AudioBufferRef::F64(buf) => interleave(&**buf, samples),
    }
}

/// planar buffer -> interleaved i16
fn interleave<S>(buf: &AudioBuffer<S>, samples: &mut Vec<i16>)
where
    S: Sample + IntoSample<i16>,
{
    let channels = buf.spec().channels.count();
    samples.reserve(buf.frames() * channels);
    for frame in 0..buf.frames() {
        for ch in 0..channels {
            samples.push(buf.chan(ch)[frame].into_sample());
        }
    }
}

/// In-process transcoder for anything symphonia can decode.
///
/// Extraction keeps the source rate and channel count; a differing target
/// is logged and otherwise ignored. Remuxing always produces a canonical
/// 16-bit WAV file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaTranscoder;

impl Transcoder for SymphoniaTranscoder {
    fn extract_pcm(
        &self,
        input: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> CodecResult<ExtractedPcm> {
        let audio = read_audio_file(input)?;
        if audio.sample_rate != sample_rate || audio.channels != channels {
            warn!(
                source_rate = audio.sample_rate,
                source_channels = audio.channels,
                target_rate = sample_rate,
                target_channels = channels,
                "keeping source format, resampling needs ffmpeg"
            );
        }
        Ok(ExtractedPcm {
            pcm: wav::samples_to_bytes(&audio.samples),
            sample_rate: audio.sample_rate,
            channels: audio.channels,
        })
    }

    fn remux_pcm(&self, pcm: &[u8], sample_rate: u32, channels: u16) -> CodecResult<Vec<u8>> {
        WavTranscoder.remux_pcm(pcm, sample_rate, channels)
    }
}
