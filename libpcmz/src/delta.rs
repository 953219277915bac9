//! Delta-Rice codec
//!
//! First-order delta over the whole interleaved stream, each delta Rice
//! coded with k = 4. Container: 12-byte header + packed bitstream.

use tracing::debug;

use crate::core::{rice, wav, BitReader, CodecError, CodecResult, FormatMetadata, DELTA_RICE_K};
use crate::reader::read_header;
use crate::{Codec, WavFormat, Writer};

/// whole-file delta + Rice codec
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaRiceCodec;

impl DeltaRiceCodec {
    pub fn new() -> Self {
        DeltaRiceCodec
    }
}

impl Codec for DeltaRiceCodec {
    fn compress(&self, wav_bytes: &[u8]) -> CodecResult<Vec<u8>> {
        let format = WavFormat::parse(wav_bytes)?;

        let mut writer = Writer::new(format);
        let mut previous = 0i32;
        let mut count = 0usize;

        for sample in wav::samples(wav::body(wav_bytes)) {
            let sample = sample as i32;
            rice::encode_value(writer.bits(), sample - previous, DELTA_RICE_K);
            previous = sample;
            count += 1;
        }

        let out = writer.finish(count)?;
        debug!(
            samples = count,
            input_bytes = wav_bytes.len(),
            output_bytes = out.len(),
            "delta-rice compressed"
        );
        Ok(out)
    }

    fn decompress(&self, blob: &[u8]) -> CodecResult<Vec<u8>> {
        let (meta, payload) = read_header(blob)?;
        let format = WavFormat::from(meta);
        format
            .require_16_bit()
            .map_err(|e| CodecError::corrupt(e.to_string()))?;

        let expected = meta.sample_len();
        let mut bits = BitReader::new(payload);
        let mut samples = Vec::with_capacity(expected.min(payload.len() * 8));
        let mut previous = 0i16;

        while samples.len() < expected {
            let Some(delta) = rice::decode_value(&mut bits, DELTA_RICE_K) else {
                return Err(CodecError::SampleCountMismatch {
                    expected,
                    actual: samples.len(),
                });
            };
            // 16-bit wraparound, same as folding negatives into [0, 65535]
            let sample = (previous as i32).wrapping_add(delta) as i16;
            samples.push(sample);
            previous = sample;
        }

        debug!(samples = expected, "delta-rice decompressed");
        Ok(wav::write(format, &samples))
    }

    fn inspect(&self, blob: &[u8]) -> CodecResult<FormatMetadata> {
        read_header(blob).map(|(meta, _)| meta)
    }
}

/// Residual sequence the codec produces for `samples`.
pub fn deltas(samples: &[i16]) -> Vec<i32> {
    let mut previous = 0i32;
    samples
        .iter()
        .map(|&s| {
            let delta = s as i32 - previous;
            previous = s as i32;
            delta
        })
        .collect()
}
