//! canonical 44-byte WAV header handling

use super::error::{CodecError, CodecResult};
use super::types::FormatMetadata;

/// size of the canonical RIFF/WAVE header
pub const WAV_HEADER_SIZE: usize = 44;

/// the only sample width the codecs accept
pub const SUPPORTED_BITS_PER_SAMPLE: u16 = 16;

const CHANNELS_OFFSET: usize = 22;
const SAMPLE_RATE_OFFSET: usize = 24;
const BITS_PER_SAMPLE_OFFSET: usize = 34;

/// Format fields of a canonical WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Read sample rate, channels and bit depth from their fixed offsets.
    ///
    /// Anything other than 16 bits per sample is rejected here, before a
    /// codec produces a single output byte.
    pub fn parse(wav: &[u8]) -> CodecResult<Self> {
        if wav.len() < WAV_HEADER_SIZE {
            return Err(CodecError::UnsupportedFormat(format!(
                "input is {} bytes, shorter than a {}-byte WAV header",
                wav.len(),
                WAV_HEADER_SIZE
            )));
        }

        let format = WavFormat {
            sample_rate: u32::from_le_bytes([
                wav[SAMPLE_RATE_OFFSET],
                wav[SAMPLE_RATE_OFFSET + 1],
                wav[SAMPLE_RATE_OFFSET + 2],
                wav[SAMPLE_RATE_OFFSET + 3],
            ]),
            channels: u16::from_le_bytes([wav[CHANNELS_OFFSET], wav[CHANNELS_OFFSET + 1]]),
            bits_per_sample: u16::from_le_bytes([
                wav[BITS_PER_SAMPLE_OFFSET],
                wav[BITS_PER_SAMPLE_OFFSET + 1],
            ]),
        };

        format.require_16_bit()?;
        Ok(format)
    }

    pub fn require_16_bit(&self) -> CodecResult<()> {
        if self.bits_per_sample != SUPPORTED_BITS_PER_SAMPLE {
            return Err(CodecError::UnsupportedFormat(format!(
                "{}-bit samples, only 16-bit PCM is supported",
                self.bits_per_sample
            )));
        }
        Ok(())
    }

    pub fn with_sample_count(self, sample_count: i32) -> FormatMetadata {
        FormatMetadata {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
            sample_count,
        }
    }
}

impl From<FormatMetadata> for WavFormat {
    fn from(meta: FormatMetadata) -> Self {
        WavFormat {
            sample_rate: meta.sample_rate,
            channels: meta.channels,
            bits_per_sample: meta.bits_per_sample,
        }
    }
}

/// PCM body of a canonical WAV file
pub fn body(wav: &[u8]) -> &[u8] {
    wav.get(WAV_HEADER_SIZE..).unwrap_or(&[])
}

/// Iterate little-endian i16 samples; an odd trailing byte is ignored.
pub fn samples(pcm: &[u8]) -> impl Iterator<Item = i16> + '_ {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Build the 44-byte header for `sample_count` samples of `format`.
pub fn header(format: WavFormat, sample_count: usize) -> Vec<u8> {
    let bytes_per_sample = (format.bits_per_sample / 8) as u32;
    let data_size = (sample_count as u32).saturating_mul(bytes_per_sample);
    let file_size = data_size.saturating_add(36);
    let byte_rate = format
        .sample_rate
        .saturating_mul(format.channels as u32)
        .saturating_mul(bytes_per_sample);
    let block_align = format.channels.saturating_mul(bytes_per_sample as u16);

    let mut buffer = Vec::with_capacity(WAV_HEADER_SIZE);

    // RIFF header
    buffer.extend_from_slice(b"RIFF");
    buffer.extend_from_slice(&file_size.to_le_bytes());
    buffer.extend_from_slice(b"WAVE");

    // fmt chunk
    buffer.extend_from_slice(b"fmt ");
    buffer.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buffer.extend_from_slice(&1u16.to_le_bytes()); // format = PCM
    buffer.extend_from_slice(&format.channels.to_le_bytes());
    buffer.extend_from_slice(&format.sample_rate.to_le_bytes());
    buffer.extend_from_slice(&byte_rate.to_le_bytes());
    buffer.extend_from_slice(&block_align.to_le_bytes());
    buffer.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    // data chunk
    buffer.extend_from_slice(b"data");
    buffer.extend_from_slice(&data_size.to_le_bytes());

    buffer
}

/// Header plus samples
pub fn write(format: WavFormat, samples: &[i16]) -> Vec<u8> {
    let mut out = header(format, samples.len());
    out.extend_from_slice(&samples_to_bytes(samples));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const CD: WavFormat = WavFormat {
        sample_rate: 44100,
        channels: 2,
        bits_per_sample: 16,
    };

    #[test]
    fn test_header_layout() {
        let h = header(CD, 10);
        assert_eq!(h.len(), WAV_HEADER_SIZE);
        assert_eq!(&h[0..4], b"RIFF");
        assert_eq!(&h[36..40], b"data");
        assert_eq!(u32::from_le_bytes([h[40], h[41], h[42], h[43]]), 20);
        assert_eq!(u32::from_le_bytes([h[4], h[5], h[6], h[7]]), 56);
    }

    #[test]
    fn test_parse_written_header() {
        let wav = write(CD, &[1, -1, 300, -300]);
        assert_eq!(WavFormat::parse(&wav).unwrap(), CD);
        let decoded: Vec<i16> = samples(body(&wav)).collect();
        assert_eq!(decoded, vec![1, -1, 300, -300]);
    }

    #[test]
    fn test_rejects_other_bit_depths() {
        for bits in [8u16, 24, 32] {
            let mut wav = header(CD, 0);
            wav[34..36].copy_from_slice(&bits.to_le_bytes());
            let err = WavFormat::parse(&wav).unwrap_err();
            assert!(matches!(err, CodecError::UnsupportedFormat(_)));
        }
    }

    #[test]
    fn test_rejects_short_input() {
        assert!(matches!(
            WavFormat::parse(&[0u8; 20]),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_odd_trailing_byte_ignored() {
        let decoded: Vec<i16> = samples(&[0x01, 0x00, 0xFF]).collect();
        assert_eq!(decoded, vec![1]);
    }
}
