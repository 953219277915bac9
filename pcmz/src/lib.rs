//! pcmz - file-level front-end for the libpcmz codecs
//!
//! Reads and writes whole files, never leaves a half-written output behind,
//! and can fall back to storing the original when compression fails.

pub mod audio;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use libpcmz::{BlockCodec, BlockMetadata, BlockReport, CodecKind, FormatMetadata, Stored};
use serde::Serialize;
use tracing::warn;

pub use audio::SymphoniaTranscoder;
pub use libpcmz::{
    BlockCodecConfig, CodecError, FfmpegTranscoder, Predictor, TimeoutPolicy, Transcoder,
    WavTranscoder,
};

/// Outcome of one file-level call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub codec: String,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub samples: usize,
    /// compression failed and the input was copied unchanged
    pub stored_original: bool,
    /// only the leading blocks were kept before the time budget ran out
    pub partial: bool,
}

impl FileReport {
    pub fn ratio(&self) -> f64 {
        if self.output_bytes == 0 {
            0.0
        } else {
            self.input_bytes as f64 / self.output_bytes as f64
        }
    }

    fn from_block(report: BlockReport) -> Self {
        FileReport {
            codec: "block".to_string(),
            input_bytes: report.input_bytes,
            output_bytes: report.output_bytes,
            samples: report.samples,
            stored_original: false,
            partial: report.partial,
        }
    }

    fn stored(codec: &str, input_bytes: u64) -> Self {
        FileReport {
            codec: codec.to_string(),
            input_bytes,
            output_bytes: input_bytes,
            samples: 0,
            stored_original: true,
            partial: false,
        }
    }
}

/// Container header as shown by `pcmz info`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_count: usize,
    pub duration_secs: Option<f64>,
    /// block containers only
    pub block_size: Option<u32>,
    pub blocks: Option<usize>,
    pub file_size: usize,
}

impl ContainerInfo {
    fn from_header(kind: CodecKind, meta: &FormatMetadata, file_size: usize) -> Self {
        ContainerInfo {
            codec: kind.name().to_string(),
            sample_rate: meta.sample_rate,
            channels: meta.channels,
            bits_per_sample: meta.bits_per_sample,
            sample_count: meta.sample_len(),
            duration_secs: Some(meta.duration_secs()),
            block_size: None,
            blocks: None,
            file_size,
        }
    }

    fn from_block(meta: &BlockMetadata, blocks: usize, samples: usize, file_size: usize) -> Self {
        let frames = samples as f64 / meta.channels.max(1) as f64;
        ContainerInfo {
            codec: meta.algorithm.clone(),
            sample_rate: meta.sample_rate,
            channels: meta.channels,
            bits_per_sample: meta.bits_per_sample,
            sample_count: samples,
            duration_secs: (meta.sample_rate > 0).then(|| frames / meta.sample_rate as f64),
            block_size: Some(meta.block_size),
            blocks: Some(blocks),
            file_size,
        }
    }
}

/// Compress a WAV file with one of the in-memory codecs.
pub fn compress_file(kind: CodecKind, input: &Path, output: &Path) -> Result<FileReport> {
    let wav = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let blob = libpcmz::compress(kind, &wav)
        .with_context(|| format!("Failed to compress {} with {}", input.display(), kind))?;
    let samples = libpcmz::inspect(kind, &blob)?.sample_len();
    write_output(output, &blob)?;

    Ok(FileReport {
        codec: kind.name().to_string(),
        input_bytes: wav.len() as u64,
        output_bytes: blob.len() as u64,
        samples,
        stored_original: false,
        partial: false,
    })
}

/// Decompress a container written by [`compress_file`] back to WAV.
pub fn decompress_file(kind: CodecKind, input: &Path, output: &Path) -> Result<FileReport> {
    let blob = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let wav = libpcmz::decompress(kind, &blob)
        .with_context(|| format!("Failed to decompress {} as {}", input.display(), kind))?;
    let samples = libpcmz::inspect(kind, &blob)?.sample_len();
    write_output(output, &wav)?;

    Ok(FileReport {
        codec: kind.name().to_string(),
        input_bytes: blob.len() as u64,
        output_bytes: wav.len() as u64,
        samples,
        stored_original: false,
        partial: false,
    })
}

/// Like [`compress_file`], but copies the input verbatim when compression
/// fails. Only a failed copy is an error.
pub fn compress_or_store(kind: CodecKind, input: &Path, output: &Path) -> Result<FileReport> {
    match compress_file(kind, input, output) {
        Ok(report) => Ok(report),
        Err(err) => {
            warn!(error = %format!("{:#}", err), input = %input.display(), "compression failed, storing original");
            let copied = fs::copy(input, output)
                .with_context(|| format!("Failed to store {} unchanged", input.display()))?;
            Ok(FileReport::stored(kind.name(), copied))
        }
    }
}

/// Block codec file compression through a transcoder.
pub fn compress_block_file(
    codec: &BlockCodec,
    input: &Path,
    output: &Path,
    transcoder: &dyn Transcoder,
    fallback: bool,
) -> Result<FileReport> {
    if !fallback {
        let report = codec
            .compress_file(input, output, transcoder)
            .with_context(|| format!("Failed to compress {}", input.display()))?;
        return Ok(FileReport::from_block(report));
    }

    match codec.compress_or_store(input, output, transcoder)? {
        Stored::Compressed(report) => Ok(FileReport::from_block(report)),
        Stored::Original { .. } => {
            let size = fs::metadata(output)?.len();
            Ok(FileReport::stored("block", size))
        }
    }
}

pub fn decompress_block_file(
    codec: &BlockCodec,
    input: &Path,
    output: &Path,
    transcoder: &dyn Transcoder,
) -> Result<FileReport> {
    let report = codec
        .decompress_file(input, output, transcoder)
        .with_context(|| format!("Failed to decompress {}", input.display()))?;
    Ok(FileReport::from_block(report))
}

/// Header information for an in-memory codec container.
pub fn container_info(kind: CodecKind, data: &[u8]) -> Result<ContainerInfo> {
    let meta = libpcmz::inspect(kind, data).context("Invalid container")?;
    Ok(ContainerInfo::from_header(kind, &meta, data.len()))
}

/// Header information for a block container. Blocks are not decoded.
pub fn block_info(data: &[u8]) -> Result<ContainerInfo> {
    let document = libpcmz::BlockDocument::from_bytes(data).context("Invalid block container")?;
    Ok(ContainerInfo::from_block(
        &document.metadata,
        document.blocks.len(),
        document.sample_count(),
        data.len(),
    ))
}

/// Write the whole buffer or nothing.
fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Err(err) = fs::write(path, bytes) {
        let _ = fs::remove_file(path);
        return Err(err).with_context(|| format!("Failed to write {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libpcmz::{wav, WavFormat};

    fn wav_file(dir: &Path, bits: u16) -> std::path::PathBuf {
        let format = WavFormat {
            sample_rate: 16000,
            channels: 1,
            bits_per_sample: bits,
        };
        let path = dir.join("in.wav");
        fs::write(&path, wav::write(format, &[0, 100, 50, -100])).unwrap();
        path
    }

    #[test]
    fn test_report_ratio() {
        let report = FileReport {
            codec: "delta".to_string(),
            input_bytes: 100,
            output_bytes: 25,
            samples: 4,
            stored_original: false,
            partial: false,
        };
        assert!((report.ratio() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_compress_file_and_info() {
        let dir = tempfile::tempdir().unwrap();
        let input = wav_file(dir.path(), 16);
        let output = dir.path().join("out.pcmz");

        let report = compress_file(CodecKind::DeltaRice, &input, &output).unwrap();
        assert_eq!(report.samples, 4);

        let info = container_info(CodecKind::DeltaRice, &fs::read(&output).unwrap()).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.sample_count, 4);
        assert_eq!(info.codec, "delta");
    }

    #[test]
    fn test_unsupported_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = wav_file(dir.path(), 24);
        let output = dir.path().join("out.pcmz");

        assert!(compress_file(CodecKind::StaticHuffman, &input, &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_fallback_copies_original() {
        let dir = tempfile::tempdir().unwrap();
        let input = wav_file(dir.path(), 8);
        let output = dir.path().join("out.pcmz");

        let report = compress_or_store(CodecKind::DeltaRice, &input, &output).unwrap();
        assert!(report.stored_original);
        assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());
    }
}
