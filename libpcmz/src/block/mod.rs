//! Block-predictive codec
//!
//! Splits the flat interleaved PCM stream into fixed-size blocks, runs a
//! predictor over each block and Rice codes the residuals with a per-block
//! parameter. Files come in and go out through a [`Transcoder`].

pub mod container;
pub mod predictor;

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

pub use container::{BlockDocument, BlockMetadata, BlockRecord, RiceBlock, ALGORITHM};
pub use predictor::{Predictor, PredictorMethod};

use crate::core::{wav, CodecError, CodecResult};
use crate::transcoder::Transcoder;

/// samples per block
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// 25 MiB
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 25 * 1024 * 1024;

pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(30);

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

pub const DEFAULT_CHANNELS: u16 = 2;

/// What to do when the budget runs out between blocks.
///
/// Running out during extraction, remuxing or decoding always fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// return [`CodecError::Timeout`], no container
    #[default]
    Fail,
    /// stop and package the blocks finished so far
    KeepPartial,
}

/// block codec settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCodecConfig {
    pub block_size: usize,
    pub max_input_bytes: u64,
    pub time_budget: Duration,
    pub target_sample_rate: u32,
    pub target_channels: u16,
    pub predictor: Predictor,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for BlockCodecConfig {
    fn default() -> Self {
        BlockCodecConfig {
            block_size: DEFAULT_BLOCK_SIZE,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            time_budget: DEFAULT_TIME_BUDGET,
            target_sample_rate: DEFAULT_SAMPLE_RATE,
            target_channels: DEFAULT_CHANNELS,
            predictor: Predictor::Constant,
            timeout_policy: TimeoutPolicy::Fail,
        }
    }
}

impl BlockCodecConfig {
    /// block size, at least one sample
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_max_input_bytes(mut self, max_input_bytes: u64) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_target_format(mut self, sample_rate: u32, channels: u16) -> Self {
        self.target_sample_rate = sample_rate;
        self.target_channels = channels;
        self
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }
}

/// wall-clock budget for one call
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Deadline {
            start: Instant::now(),
            budget,
        }
    }

    pub fn expired(&self) -> bool {
        self.start.elapsed() >= self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn timeout(&self, phase: &'static str) -> CodecError {
        CodecError::Timeout {
            phase,
            budget: self.budget,
        }
    }

    /// Hard check between phases.
    pub fn check(&self, phase: &'static str) -> CodecResult<()> {
        if self.expired() {
            return Err(self.timeout(phase));
        }
        Ok(())
    }
}

/// summary of one file-level call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    pub blocks: usize,
    pub samples: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    /// the budget ran out and only the leading blocks were kept
    pub partial: bool,
}

/// how [`BlockCodec::compress_or_store`] stored the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stored {
    Compressed(BlockReport),
    /// compression failed; the original bytes were copied unchanged
    Original { reason: String },
}

/// fixed-size block predictive codec
#[derive(Debug, Clone, Default)]
pub struct BlockCodec {
    config: BlockCodecConfig,
}

impl BlockCodec {
    pub fn new(config: BlockCodecConfig) -> Self {
        BlockCodec { config }
    }

    pub fn config(&self) -> &BlockCodecConfig {
        &self.config
    }

    fn check_size(&self, size: u64) -> CodecResult<()> {
        if size > self.config.max_input_bytes {
            return Err(CodecError::SizeLimitExceeded {
                size,
                limit: self.config.max_input_bytes,
            });
        }
        Ok(())
    }

    /// Encode raw interleaved PCM into a block document.
    ///
    /// The deadline is checked after every block; what happens when it has
    /// passed depends on the configured [`TimeoutPolicy`].
    pub fn encode_pcm(
        &self,
        pcm: &[u8],
        sample_rate: u32,
        channels: u16,
        deadline: &Deadline,
    ) -> CodecResult<(BlockDocument, bool)> {
        self.config.predictor.validate()?;

        let samples: Vec<i16> = wav::samples(pcm).collect();
        let block_size = self.config.block_size.max(1);
        let total_blocks = samples.len().div_ceil(block_size);

        let mut blocks = Vec::with_capacity(total_blocks);
        let mut partial = false;

        for (index, chunk) in samples.chunks(block_size).enumerate() {
            blocks.push(BlockRecord::encode(chunk, &self.config.predictor));

            let remaining = index + 1 < total_blocks;
            if remaining && deadline.expired() {
                match self.config.timeout_policy {
                    TimeoutPolicy::Fail => return Err(deadline.timeout("block encoding")),
                    TimeoutPolicy::KeepPartial => {
                        warn!(
                            kept = blocks.len(),
                            total = total_blocks,
                            "time budget exhausted, packaging partial block list"
                        );
                        partial = true;
                        break;
                    }
                }
            }
        }

        let document = BlockDocument {
            metadata: BlockMetadata {
                sample_rate,
                channels,
                bits_per_sample: wav::SUPPORTED_BITS_PER_SAMPLE,
                block_size: block_size as u32,
                algorithm: ALGORITHM.to_string(),
            },
            blocks,
        };
        Ok((document, partial))
    }

    /// Raw PCM -> container bytes.
    ///
    /// The size ceiling applies to the PCM itself here, since there is no
    /// input file to measure.
    pub fn compress_pcm(
        &self,
        pcm: &[u8],
        sample_rate: u32,
        channels: u16,
    ) -> CodecResult<(Vec<u8>, BlockReport)> {
        self.check_size(pcm.len() as u64)?;

        let deadline = Deadline::start(self.config.time_budget);
        let (document, partial) = self.encode_pcm(pcm, sample_rate, channels, &deadline)?;
        let bytes = document.to_bytes()?;

        let report = BlockReport {
            blocks: document.blocks.len(),
            samples: document.sample_count(),
            input_bytes: pcm.len() as u64,
            output_bytes: bytes.len() as u64,
            partial,
        };
        Ok((bytes, report))
    }

    /// container bytes -> stored metadata + raw PCM
    pub fn decompress_pcm(&self, blob: &[u8]) -> CodecResult<(BlockMetadata, Vec<u8>)> {
        let document = BlockDocument::from_bytes(blob)?;
        let pcm = decode_document(&document)?;
        Ok((document.metadata, pcm))
    }

    /// metadata without decoding any block
    pub fn inspect(&self, blob: &[u8]) -> CodecResult<BlockMetadata> {
        BlockDocument::from_bytes(blob).map(|d| d.metadata)
    }

    /// Extract, encode and write `output`. Nothing is written on failure.
    ///
    /// The size ceiling is checked against the input file; the extracted
    /// PCM may be larger.
    pub fn compress_file(
        &self,
        input: &Path,
        output: &Path,
        transcoder: &dyn Transcoder,
    ) -> CodecResult<BlockReport> {
        let input_bytes = fs::metadata(input)?.len();
        self.check_size(input_bytes)?;

        let deadline = Deadline::start(self.config.time_budget);
        let extracted = transcoder.extract_pcm(
            input,
            self.config.target_sample_rate,
            self.config.target_channels,
        )?;
        deadline.check("pcm extraction")?;

        let (document, partial) = self.encode_pcm(
            &extracted.pcm,
            extracted.sample_rate,
            extracted.channels,
            &deadline,
        )?;
        let bytes = document.to_bytes()?;
        write_output(output, &bytes)?;

        let report = BlockReport {
            blocks: document.blocks.len(),
            samples: document.sample_count(),
            input_bytes,
            output_bytes: bytes.len() as u64,
            partial,
        };
        debug!(?report, elapsed = ?deadline.elapsed(), "block compressed");
        Ok(report)
    }

    /// Decode `input` and have the transcoder remux it into `output`.
    pub fn decompress_file(
        &self,
        input: &Path,
        output: &Path,
        transcoder: &dyn Transcoder,
    ) -> CodecResult<BlockReport> {
        let deadline = Deadline::start(self.config.time_budget);
        let blob = fs::read(input)?;
        let document = BlockDocument::from_bytes(&blob)?;
        let pcm = decode_document(&document)?;
        deadline.check("block decoding")?;

        let metadata = &document.metadata;
        let playable = transcoder.remux_pcm(&pcm, metadata.sample_rate, metadata.channels)?;
        deadline.check("remux")?;
        write_output(output, &playable)?;

        let report = BlockReport {
            blocks: document.blocks.len(),
            samples: pcm.len() / 2,
            input_bytes: blob.len() as u64,
            output_bytes: playable.len() as u64,
            partial: false,
        };
        debug!(?report, elapsed = ?deadline.elapsed(), "block decompressed");
        Ok(report)
    }

    /// Compress, or copy the original verbatim when compression fails.
    ///
    /// Only a failed copy is reported as an error.
    pub fn compress_or_store(
        &self,
        input: &Path,
        output: &Path,
        transcoder: &dyn Transcoder,
    ) -> CodecResult<Stored> {
        match self.compress_file(input, output, transcoder) {
            Ok(report) => Ok(Stored::Compressed(report)),
            Err(err) => {
                if err.is_validation() {
                    warn!(error = %err, input = %input.display(), "compression failed, storing original");
                } else {
                    error!(error = %err, input = %input.display(), "unexpected compression fault, storing original");
                }
                fs::copy(input, output)?;
                Ok(Stored::Original {
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// Decode every block in order into raw PCM.
fn decode_document(document: &BlockDocument) -> CodecResult<Vec<u8>> {
    if document.metadata.bits_per_sample != wav::SUPPORTED_BITS_PER_SAMPLE {
        return Err(CodecError::corrupt(format!(
            "{}-bit block container",
            document.metadata.bits_per_sample
        )));
    }

    let mut samples = Vec::new();
    for block in &document.blocks {
        samples.extend(block.decode()?);
    }
    Ok(wav::samples_to_bytes(&samples))
}

/// Write the whole buffer, removing a half-written file on error.
fn write_output(path: &Path, bytes: &[u8]) -> CodecResult<()> {
    if let Err(err) = fs::write(path, bytes) {
        let _ = fs::remove_file(path);
        return Err(err.into());
    }
    Ok(())
}
