use crate::core::{
    BitWriter, CodecError, CodecResult, CONTAINER_HEADER_SIZE, SAMPLE_COUNT_OFFSET,
};
use crate::WavFormat;

/// container writer for the header-first formats
///
/// The header goes out with `sample_count = 0`; the real count is patched
/// in place once the payload is complete.
pub struct Writer {
    bits: BitWriter,
}

impl Writer {
    /// new writer
    pub fn new(format: WavFormat) -> Self {
        Writer {
            bits: BitWriter::with_prefix(format.with_sample_count(0).to_bytes().to_vec()),
        }
    }

    /// header followed by a `u32 BE` length and the side table bytes
    pub fn with_side_table(format: WavFormat, table: &[u8]) -> Self {
        let header = format.with_sample_count(0).to_bytes();
        let mut buffer = Vec::with_capacity(CONTAINER_HEADER_SIZE + 4 + table.len());
        buffer.extend_from_slice(&header);
        buffer.extend_from_slice(&(table.len() as u32).to_be_bytes());
        buffer.extend_from_slice(table);
        Writer {
            bits: BitWriter::with_prefix(buffer),
        }
    }

    /// payload bit sink
    pub fn bits(&mut self) -> &mut BitWriter {
        &mut self.bits
    }

    /// Flush the payload and rewrite the header's sample count.
    pub fn finish(self, sample_count: usize) -> CodecResult<Vec<u8>> {
        let count = i32::try_from(sample_count).map_err(|_| {
            CodecError::UnsupportedFormat(format!(
                "{} samples do not fit the container's i32 count",
                sample_count
            ))
        })?;

        let mut buffer = self.bits.flush();
        patch_sample_count(&mut buffer, count)?;
        Ok(buffer)
    }
}

/// Rewrite `sample_count` in an already-written header.
pub fn patch_sample_count(buffer: &mut [u8], sample_count: i32) -> CodecResult<()> {
    let field = buffer
        .get_mut(SAMPLE_COUNT_OFFSET..CONTAINER_HEADER_SIZE)
        .ok_or_else(|| CodecError::Internal("header not written before patch".to_string()))?;
    field.copy_from_slice(&sample_count.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_header;

    const MONO: WavFormat = WavFormat {
        sample_rate: 16000,
        channels: 1,
        bits_per_sample: 16,
    };

    #[test]
    fn test_count_is_patched() {
        let mut writer = Writer::new(MONO);
        writer.bits().write_bits(0b1, 1);
        let out = writer.finish(7).unwrap();
        let (meta, payload) = read_header(&out).unwrap();
        assert_eq!(meta.sample_count, 7);
        assert_eq!(payload, &[0x80]);
    }

    #[test]
    fn test_side_table_prefix() {
        let writer = Writer::with_side_table(MONO, &[9, 9, 9, 9, 9, 9]);
        let out = writer.finish(0).unwrap();
        assert_eq!(&out[12..16], &[0, 0, 0, 6]);
        assert_eq!(out.len(), 12 + 4 + 6);
    }

    #[test]
    fn test_patch_needs_header() {
        assert!(patch_sample_count(&mut [0u8; 4], 1).is_err());
    }
}
