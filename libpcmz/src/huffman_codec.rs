//! Static-Huffman codec
//!
//! Two passes over the WAV body: one to count raw sample values, one to
//! emit a `0` marker bit plus the sample's code for every sample.
//!
//! | Part    | Layout                                              |
//! |---------|-----------------------------------------------------|
//! | header  | 12 bytes, same as the delta codec                   |
//! | table   | `len: u32 BE`, then `{symbol: i16 BE, count: u32 BE}*` |
//! | payload | `(marker + code)*`, zero-padded to a byte           |

use tracing::debug;

use crate::core::huffman::{CodeTable, FrequencyTable, HuffmanCode};
use crate::core::{wav, BitReader, CodecError, CodecResult, FormatMetadata};
use crate::reader::{read_header, Cursor};
use crate::{Codec, WavFormat, Writer};

/// marker bit written before every code
pub const HUFFMAN_MARKER_BIT: bool = false;

/// samples per chunk when streaming the body
const CHUNK_SAMPLES: usize = 4096;

/// whole-file static Huffman codec over raw samples
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticHuffmanCodec;

impl StaticHuffmanCodec {
    pub fn new() -> Self {
        StaticHuffmanCodec
    }

    /// Pass 1: exhaustive histogram of raw sample values.
    pub fn frequency_table(pcm: &[u8]) -> FrequencyTable {
        let mut table = FrequencyTable::new();
        for chunk in pcm.chunks(CHUNK_SAMPLES * 2) {
            for sample in wav::samples(chunk) {
                table.add(sample);
            }
        }
        table
    }
}

impl Codec for StaticHuffmanCodec {
    fn compress(&self, wav_bytes: &[u8]) -> CodecResult<Vec<u8>> {
        let format = WavFormat::parse(wav_bytes)?;
        let pcm = wav::body(wav_bytes);

        let table = Self::frequency_table(pcm);
        let codes = CodeTable::from_table(&table)?;

        let mut writer = Writer::with_side_table(format, &table.to_bytes());
        let mut count = 0usize;

        // pass 2
        for chunk in pcm.chunks(CHUNK_SAMPLES * 2) {
            for sample in wav::samples(chunk) {
                let code = codes.code(sample).ok_or_else(|| {
                    CodecError::Internal(format!("sample {} has no huffman code", sample))
                })?;
                let bits = writer.bits();
                bits.write_bit(HUFFMAN_MARKER_BIT);
                bits.write_bits(code.bits, code.len);
                count += 1;
            }
        }

        let out = writer.finish(count)?;
        debug!(
            samples = count,
            symbols = table.len(),
            max_code_len = codes.max_len(),
            output_bytes = out.len(),
            "huffman compressed"
        );
        Ok(out)
    }

    fn decompress(&self, blob: &[u8]) -> CodecResult<Vec<u8>> {
        let (meta, rest) = read_header(blob)?;
        let format = WavFormat::from(meta);
        format
            .require_16_bit()
            .map_err(|e| CodecError::corrupt(e.to_string()))?;

        let mut cursor = Cursor::new(rest);
        let table_len = cursor.read_u32_be()? as usize;
        let table_bytes = cursor.read_bytes(table_len).map_err(|_| {
            CodecError::corrupt(format!(
                "frequency table claims {} bytes, only {} remain",
                table_len,
                rest.len().saturating_sub(4)
            ))
        })?;
        let table = FrequencyTable::from_bytes(table_bytes)?;
        let codes = CodeTable::from_table(&table)?;

        let expected = meta.sample_len();
        if expected > 0 && codes.is_empty() {
            return Err(CodecError::corrupt(
                "samples declared but frequency table is empty",
            ));
        }

        let payload = cursor.rest();
        let mut bits = BitReader::new(payload);
        let mut samples = Vec::with_capacity(expected.min(payload.len() * 4));

        while samples.len() < expected {
            let Some(marker) = bits.read_bit() else {
                return Err(CodecError::SampleCountMismatch {
                    expected,
                    actual: samples.len(),
                });
            };
            if marker != HUFFMAN_MARKER_BIT {
                return Err(CodecError::corrupt(format!(
                    "marker bit set before symbol {}",
                    samples.len()
                )));
            }
            samples.push(read_symbol(&mut bits, &codes, samples.len())?);
        }

        debug!(samples = expected, "huffman decompressed");
        Ok(wav::write(format, &samples))
    }

    fn inspect(&self, blob: &[u8]) -> CodecResult<FormatMetadata> {
        read_header(blob).map(|(meta, _)| meta)
    }
}

/// Grow a candidate code one bit at a time until it names a symbol.
fn read_symbol(bits: &mut BitReader, codes: &CodeTable, index: usize) -> CodecResult<i16> {
    let mut candidate = HuffmanCode { bits: 0, len: 0 };

    while candidate.len < codes.max_len() {
        let bit = bits.read_bit().ok_or_else(|| {
            CodecError::corrupt(format!("payload ends inside the code of symbol {}", index))
        })?;
        candidate.bits = (candidate.bits << 1) | bit as u64;
        candidate.len += 1;

        if let Some(symbol) = codes.lookup(candidate) {
            return Ok(symbol);
        }
    }

    Err(CodecError::corrupt(format!(
        "no code matches symbol {} within {} bits",
        index,
        codes.max_len()
    )))
}
