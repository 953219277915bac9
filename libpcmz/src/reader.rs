use crate::core::{CodecError, CodecResult, FormatMetadata, CONTAINER_HEADER_SIZE};

/// Parse the 12-byte header that opens the delta and huffman containers.
pub fn read_header(data: &[u8]) -> CodecResult<(FormatMetadata, &[u8])> {
    if data.len() < CONTAINER_HEADER_SIZE {
        return Err(CodecError::corrupt(format!(
            "container is {} bytes, shorter than its {}-byte header",
            data.len(),
            CONTAINER_HEADER_SIZE
        )));
    }

    let mut cursor = Cursor::new(data);
    let meta = FormatMetadata {
        sample_rate: cursor.read_u32_le()?,
        channels: cursor.read_u16_le()?,
        bits_per_sample: cursor.read_u16_le()?,
        sample_count: cursor.read_i32_le()?,
    };

    if meta.sample_count < 0 {
        return Err(CodecError::corrupt(format!(
            "negative sample count {}",
            meta.sample_count
        )));
    }

    Ok((meta, cursor.rest()))
}

// cursor helper

pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| CodecError::corrupt("unexpected end of container"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn read_u16_le(&mut self) -> CodecResult<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32_le(&mut self) -> CodecResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u32_be(&mut self) -> CodecResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_i32_le(&mut self) -> CodecResult<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
