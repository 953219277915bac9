//! Getting raw PCM out of arbitrary files and back into playable ones
//!
//! The block codec never parses input containers itself. It asks a
//! [`Transcoder`] for interleaved little-endian i16 PCM and hands decoded
//! PCM back to it for remuxing.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;
use uuid::Uuid;

use crate::core::{wav, CodecError, CodecResult, WavFormat};

/// raw PCM plus the format it actually came out in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPcm {
    /// interleaved little-endian i16
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// external collaborator for format extraction and remuxing
pub trait Transcoder {
    /// Decode `input` to raw interleaved i16 PCM, at the requested rate and
    /// channel count where the implementation can convert.
    fn extract_pcm(&self, input: &Path, sample_rate: u32, channels: u16)
        -> CodecResult<ExtractedPcm>;

    /// Wrap raw PCM into a playable container.
    fn remux_pcm(&self, pcm: &[u8], sample_rate: u32, channels: u16) -> CodecResult<Vec<u8>>;
}

/// In-process transcoder for canonical 16-bit WAV files.
///
/// Extraction keeps the source rate and channel count; it does not resample.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavTranscoder;

impl Transcoder for WavTranscoder {
    fn extract_pcm(
        &self,
        input: &Path,
        _sample_rate: u32,
        _channels: u16,
    ) -> CodecResult<ExtractedPcm> {
        let bytes = fs::read(input)?;
        let format = WavFormat::parse(&bytes)?;
        let body = wav::body(&bytes);
        // drop a dangling odd byte so the PCM is whole samples
        let whole = body.len() - body.len() % 2;
        Ok(ExtractedPcm {
            pcm: body[..whole].to_vec(),
            sample_rate: format.sample_rate,
            channels: format.channels,
        })
    }

    fn remux_pcm(&self, pcm: &[u8], sample_rate: u32, channels: u16) -> CodecResult<Vec<u8>> {
        let format = WavFormat {
            sample_rate,
            channels,
            bits_per_sample: wav::SUPPORTED_BITS_PER_SAMPLE,
        };
        let mut out = wav::header(format, pcm.len() / 2);
        out.extend_from_slice(pcm);
        Ok(out)
    }
}

/// Transcoder that shells out to ffmpeg, one process per call.
///
/// Every call works through temp files named with a fresh UUID, so
/// concurrent calls never share a path. Temp files are removed on drop.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    output_format: String,
    temp_dir: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        FfmpegTranscoder {
            program: PathBuf::from("ffmpeg"),
            output_format: "wav".to_string(),
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// container extension for remuxed output, e.g. "wav", "flac", "mp3"
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn output_format(&self) -> &str {
        &self.output_format
    }

    fn run(&self, args: &[String], output: &TempFile) -> CodecResult<Vec<u8>> {
        debug!(program = %self.program.display(), ?args, "running transcoder");

        let result = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                CodecError::ExternalToolFailure(format!(
                    "could not start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(CodecError::ExternalToolFailure(format!(
                "{} exited with {}: {}",
                self.program.display(),
                result.status,
                stderr.trim()
            )));
        }

        fs::read(output.path()).map_err(|e| {
            CodecError::ExternalToolFailure(format!(
                "{} produced no output at {}: {}",
                self.program.display(),
                output.path().display(),
                e
            ))
        })
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder for FfmpegTranscoder {
    fn extract_pcm(
        &self,
        input: &Path,
        sample_rate: u32,
        channels: u16,
    ) -> CodecResult<ExtractedPcm> {
        if !input.exists() {
            return Err(CodecError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", input.display()),
            )));
        }

        let output = TempFile::new(&self.temp_dir, "pcm");
        let args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-ac".to_string(),
            channels.to_string(),
            output.path().display().to_string(),
        ];

        let pcm = self.run(&args, &output)?;
        Ok(ExtractedPcm {
            pcm,
            sample_rate,
            channels,
        })
    }

    fn remux_pcm(&self, pcm: &[u8], sample_rate: u32, channels: u16) -> CodecResult<Vec<u8>> {
        let input = TempFile::new(&self.temp_dir, "pcm");
        fs::write(input.path(), pcm)?;
        let output = TempFile::new(&self.temp_dir, &self.output_format);

        let args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-ac".to_string(),
            channels.to_string(),
            "-i".to_string(),
            input.path().display().to_string(),
            output.path().display().to_string(),
        ];

        self.run(&args, &output)
    }
}

/// uniquely named temp path, removed when dropped
struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(dir: &Path, extension: &str) -> Self {
        TempFile {
            path: dir.join(format!("pcmz-{}.{}", Uuid::new_v4(), extension)),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
