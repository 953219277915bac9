//! Lossless codecs for 16-bit PCM audio.
//!
//! Three independent formats:
//!
//! * [`DeltaRiceCodec`]: first-order delta + Rice (k = 4)
//! * [`StaticHuffmanCodec`]: whole-file histogram + Huffman
//! * [`BlockCodec`]: fixed-size blocks, selectable predictor, per-block Rice
//!
//! The first two work on canonical 44-byte-header WAV bytes in memory. The
//! block codec works on files and leans on a [`Transcoder`] to get raw PCM in
//! and a playable file back out.

use std::fmt;
use std::str::FromStr;

pub mod block;
pub mod core;
pub mod delta;
pub mod huffman_codec;
pub mod transcoder;

mod reader;
mod writer;

pub use crate::core::{
    bitstream, huffman, rice, wav, BitReader, BitWriter, CodecError, CodecResult,
    FormatMetadata, WavFormat, CONTAINER_HEADER_SIZE,
};
pub use block::{
    BlockCodec, BlockCodecConfig, BlockDocument, BlockMetadata, BlockRecord, BlockReport,
    Predictor, PredictorMethod, Stored, TimeoutPolicy,
};
pub use delta::DeltaRiceCodec;
pub use huffman_codec::StaticHuffmanCodec;
pub use reader::read_header;
pub use transcoder::{ExtractedPcm, FfmpegTranscoder, Transcoder, WavTranscoder};
pub use writer::Writer;

/// A codec that turns canonical WAV bytes into a container and back.
pub trait Codec {
    /// WAV bytes in, container bytes out. Fails before producing any output
    /// when the input is not 16-bit PCM.
    fn compress(&self, wav: &[u8]) -> CodecResult<Vec<u8>>;

    /// Container bytes in, canonical WAV bytes out.
    fn decompress(&self, blob: &[u8]) -> CodecResult<Vec<u8>>;

    /// Format metadata recorded in a container's header.
    fn inspect(&self, blob: &[u8]) -> CodecResult<FormatMetadata>;
}

/// in-memory codecs selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    DeltaRice,
    StaticHuffman,
}

impl CodecKind {
    pub fn codec(self) -> &'static dyn Codec {
        match self {
            CodecKind::DeltaRice => &DeltaRiceCodec,
            CodecKind::StaticHuffman => &StaticHuffmanCodec,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecKind::DeltaRice => "delta",
            CodecKind::StaticHuffman => "huffman",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delta" | "delta-rice" | "rice" => Ok(CodecKind::DeltaRice),
            "huffman" | "static-huffman" => Ok(CodecKind::StaticHuffman),
            other => Err(CodecError::UnsupportedFormat(format!(
                "unknown codec '{}', expected delta or huffman",
                other
            ))),
        }
    }
}

/// compress WAV bytes with the chosen codec
pub fn compress(kind: CodecKind, wav: &[u8]) -> CodecResult<Vec<u8>> {
    kind.codec().compress(wav)
}

/// decompress a container back to WAV bytes
pub fn decompress(kind: CodecKind, blob: &[u8]) -> CodecResult<Vec<u8>> {
    kind.codec().decompress(blob)
}

/// read a container's format metadata without decoding the payload
pub fn inspect(kind: CodecKind, blob: &[u8]) -> CodecResult<FormatMetadata> {
    kind.codec().inspect(blob)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_kind_parsing() {
        assert_eq!("delta".parse::<CodecKind>().unwrap(), CodecKind::DeltaRice);
        assert_eq!(
            "Huffman".parse::<CodecKind>().unwrap(),
            CodecKind::StaticHuffman
        );
        assert!("flac".parse::<CodecKind>().is_err());
        assert_eq!(CodecKind::DeltaRice.to_string(), "delta");
    }

    #[test]
    fn test_dispatch_round_trip() {
        let format = WavFormat {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
        };
        let input = wav::write(format, &[3, -3, 9, -9, 27, -27]);
        for kind in [CodecKind::DeltaRice, CodecKind::StaticHuffman] {
            let blob = compress(kind, &input).unwrap();
            assert_eq!(decompress(kind, &blob).unwrap(), input);
            assert_eq!(inspect(kind, &blob).unwrap().sample_count, 6);
        }
    }
}
