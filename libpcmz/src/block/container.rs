//! Block container: `len: u32 BE` + MessagePack document
//!
//! ```text
//! {
//!   metadata: {sample_rate, channels, bits_per_sample, block_size, algorithm},
//!   blocks: [{method, rice: {parameter, values, count}, coefficients, sample_count}]
//! }
//! ```
//!
//! `rice.values` holds the residual triples packed as unary quotient,
//! `parameter`-bit remainder and one sign bit each.

use rmp_serde::{from_slice, to_vec_named};
use serde::{Deserialize, Serialize};

use super::predictor::{Predictor, PredictorMethod};
use crate::core::rice::{self, RiceTriple, MAX_BLOCK_K, MIN_BLOCK_K};
use crate::core::{CodecError, CodecResult};
use crate::reader::Cursor;

/// algorithm tag written into every document
pub const ALGORITHM: &str = "block-rice";

/// bytes in the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub block_size: u32,
    pub algorithm: String,
}

/// per-block Rice payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiceBlock {
    pub parameter: u8,
    #[serde(with = "serde_bytes")]
    pub values: Vec<u8>,
    pub count: u32,
}

impl RiceBlock {
    pub fn triples(&self) -> CodecResult<Vec<RiceTriple>> {
        rice::unpack_triples(&self.values, self.parameter, self.count as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub method: PredictorMethod,
    pub rice: RiceBlock,
    #[serde(default)]
    pub coefficients: Vec<i32>,
    pub sample_count: u32,
}

impl BlockRecord {
    /// Predict, pick the block's Rice parameter, pack the triples.
    pub fn encode(samples: &[i16], predictor: &Predictor) -> Self {
        let residuals = predictor.residuals(samples);
        let parameter = rice::block_parameter(&residuals);
        let triples: Vec<RiceTriple> = residuals
            .iter()
            .map(|&r| RiceTriple::from_value(r, parameter))
            .collect();

        BlockRecord {
            method: predictor.method(),
            rice: RiceBlock {
                parameter,
                values: rice::pack_triples(&triples, parameter),
                count: triples.len() as u32,
            },
            coefficients: predictor.coefficients(),
            sample_count: samples.len() as u32,
        }
    }

    /// Undo Rice coding, then the recorded predictor.
    pub fn decode(&self) -> CodecResult<Vec<i16>> {
        let k = self.rice.parameter;
        if !(MIN_BLOCK_K..=MAX_BLOCK_K).contains(&k) {
            return Err(CodecError::corrupt(format!(
                "rice parameter {} outside {}..={}",
                k, MIN_BLOCK_K, MAX_BLOCK_K
            )));
        }
        if self.rice.count != self.sample_count {
            return Err(CodecError::corrupt(format!(
                "block holds {} residuals for {} samples",
                self.rice.count, self.sample_count
            )));
        }

        let predictor = Predictor::from_record(self.method, &self.coefficients)?;
        let residuals: Vec<i32> = self.rice.triples()?.iter().map(|t| t.value(k)).collect();
        Ok(predictor.reconstruct(&residuals))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDocument {
    pub metadata: BlockMetadata,
    pub blocks: Vec<BlockRecord>,
}

impl BlockDocument {
    pub fn sample_count(&self) -> usize {
        self.blocks.iter().map(|b| b.sample_count as usize).sum()
    }

    /// length prefix + named-field MessagePack
    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        let document = to_vec_named(self)
            .map_err(|e| CodecError::Internal(format!("block document encode: {}", e)))?;
        let len = u32::try_from(document.len())
            .map_err(|_| CodecError::Internal("block document over 4 GiB".to_string()))?;

        let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + document.len());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&document);
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> CodecResult<Self> {
        let mut cursor = Cursor::new(data);
        let len = cursor.read_u32_be()? as usize;
        let body = cursor.rest();
        if body.len() != len {
            return Err(CodecError::corrupt(format!(
                "length prefix says {} bytes, container holds {}",
                len,
                body.len()
            )));
        }

        from_slice(body).map_err(|e| CodecError::corrupt(format!("block document: {}", e)))
    }
}
