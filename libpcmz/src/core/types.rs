//! common types for the pcmz containers

use serde::Serialize;

// constants

/// size of the header shared by the delta and huffman containers
pub const CONTAINER_HEADER_SIZE: usize = 12;

/// byte offset of `sample_count` inside that header
pub const SAMPLE_COUNT_OFFSET: usize = 8;

// types

/// Format metadata carried by every container
///
/// | Offset | Field           | Type   |
/// |--------|-----------------|--------|
/// | 0      | sample_rate     | u32 LE |
/// | 4      | channels        | u16 LE |
/// | 6      | bits_per_sample | u16 LE |
/// | 8      | sample_count    | i32 LE |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatMetadata {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_count: i32,
}

impl FormatMetadata {
    pub fn to_bytes(&self) -> [u8; CONTAINER_HEADER_SIZE] {
        let mut out = [0u8; CONTAINER_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[4..6].copy_from_slice(&self.channels.to_le_bytes());
        out[6..8].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[8..12].copy_from_slice(&self.sample_count.to_le_bytes());
        out
    }

    /// sample count as a length; negative counts are treated as empty
    pub fn sample_len(&self) -> usize {
        usize::try_from(self.sample_count).unwrap_or(0)
    }

    /// seconds of audio described by the header
    pub fn duration_secs(&self) -> f64 {
        let per_second = self.sample_rate as f64 * self.channels.max(1) as f64;
        if per_second == 0.0 {
            0.0
        } else {
            self.sample_len() as f64 / per_second
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_byte_layout() {
        let meta = FormatMetadata {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
            sample_count: 4,
        };
        let bytes = meta.to_bytes();
        assert_eq!(&bytes[0..4], &44100u32.to_le_bytes());
        assert_eq!(&bytes[4..6], &[2, 0]);
        assert_eq!(&bytes[6..8], &[16, 0]);
        assert_eq!(&bytes[SAMPLE_COUNT_OFFSET..], &[4, 0, 0, 0]);
    }

    #[test]
    fn test_duration() {
        let meta = FormatMetadata {
            sample_rate: 8000,
            channels: 2,
            bits_per_sample: 16,
            sample_count: 16000,
        };
        assert!((meta.duration_secs() - 1.0).abs() < 1e-9);
    }
}
