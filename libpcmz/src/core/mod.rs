pub mod bitstream;
pub mod error;
pub mod huffman;
pub mod rice;
pub mod types;
pub mod wav;

pub use bitstream::{BitReader, BitWriter};
pub use error::{CodecError, CodecResult};
pub use huffman::{CodeTable, FrequencyTable, HuffmanCode, HuffmanTree};
pub use rice::{
    block_parameter, decode_value as rice_decode_value, encode_value as rice_encode_value,
    RiceTriple, DELTA_RICE_K,
};
pub use types::*;
pub use wav::WavFormat;
