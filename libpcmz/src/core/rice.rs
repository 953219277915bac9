// Rice coding for prediction residuals

use serde::{Deserialize, Serialize};

use super::bitstream::{BitReader, BitWriter};
use super::error::{CodecError, CodecResult};

/// Fixed parameter used by the delta codec
pub const DELTA_RICE_K: u8 = 4;

/// Smallest per-block parameter
pub const MIN_BLOCK_K: u8 = 1;

/// Largest per-block parameter
pub const MAX_BLOCK_K: u8 = 15;

/// Zigzag: map signed to unsigned
/// 0 → 0, -1 → 1, 1 → 2, -2 → 3, 2 → 4, ...
#[inline]
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode`]
#[inline]
pub fn zigzag_decode(unsigned: u32) -> i32 {
    if unsigned & 1 == 0 {
        (unsigned >> 1) as i32
    } else {
        -(((unsigned >> 1) + 1) as i64) as i32
    }
}

/// Write one residual as unary quotient + k-bit remainder.
pub fn encode_value(bits: &mut BitWriter, value: i32, k: u8) {
    let unsigned = zigzag_encode(value);
    let quotient = unsigned >> k;
    let remainder = unsigned & ((1u32 << k) - 1);

    bits.write_unary(quotient);
    bits.write_bits(remainder as u64, k);
}

/// Read one residual; `None` when the stream ends mid-code.
pub fn decode_value(bits: &mut BitReader, k: u8) -> Option<i32> {
    let quotient = bits.read_unary()?;
    let remainder = bits.read_bits(k)? as u32;
    let unsigned = (quotient << k) | remainder;
    Some(zigzag_decode(unsigned))
}

/// Per-block parameter: clamp(floor(log2(2 * mean|r|)), 1, 15)
pub fn block_parameter(residuals: &[i32]) -> u8 {
    if residuals.is_empty() {
        return MIN_BLOCK_K;
    }

    let sum: u64 = residuals.iter().map(|&r| r.unsigned_abs() as u64).sum();
    let mean = sum as f64 / residuals.len() as f64;
    let scaled = 2.0 * mean;

    if scaled < 2.0 {
        // log2 below 1, including the all-zero block
        return MIN_BLOCK_K;
    }

    (scaled.log2().floor() as i64).clamp(MIN_BLOCK_K as i64, MAX_BLOCK_K as i64) as u8
}

/// Rice split of one residual's magnitude plus its sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiceTriple {
    pub quotient: u32,
    pub remainder: u32,
    pub negative: bool,
}

impl RiceTriple {
    pub fn from_value(value: i32, k: u8) -> Self {
        let magnitude = value.unsigned_abs();
        RiceTriple {
            quotient: magnitude >> k,
            remainder: magnitude & ((1u32 << k) - 1),
            negative: value < 0,
        }
    }

    /// Rebuild the residual. Magnitudes beyond i32 saturate.
    pub fn value(&self, k: u8) -> i32 {
        let magnitude = ((self.quotient as u64) << k) | self.remainder as u64;
        let signed = if self.negative {
            -(magnitude as i64)
        } else {
            magnitude as i64
        };
        signed.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}

/// Pack triples as unary quotient, k-bit remainder, one sign bit.
pub fn pack_triples(triples: &[RiceTriple], k: u8) -> Vec<u8> {
    let mut bits = BitWriter::new();
    for triple in triples {
        bits.write_unary(triple.quotient);
        bits.write_bits(triple.remainder as u64, k);
        bits.write_bit(triple.negative);
    }
    bits.flush()
}

/// Unpack exactly `count` triples; fewer is a corrupt block.
pub fn unpack_triples(packed: &[u8], k: u8, count: usize) -> CodecResult<Vec<RiceTriple>> {
    let mut bits = BitReader::new(packed);
    // every triple takes at least two bits
    let mut triples = Vec::with_capacity(count.min(packed.len() * 4));

    for index in 0..count {
        let triple = read_triple(&mut bits, k).ok_or_else(|| {
            CodecError::corrupt(format!(
                "rice values end after {} of {} residuals",
                index, count
            ))
        })?;
        triples.push(triple);
    }

    Ok(triples)
}

fn read_triple(bits: &mut BitReader, k: u8) -> Option<RiceTriple> {
    let quotient = bits.read_unary()?;
    let remainder = bits.read_bits(k)? as u32;
    let negative = bits.read_bit()?;
    Some(RiceTriple {
        quotient,
        remainder,
        negative,
    })
}
