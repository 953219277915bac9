use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use libpcmz::{BlockCodec, CodecKind};
use pcmz::{
    BlockCodecConfig, ContainerInfo, FfmpegTranscoder, FileReport, Predictor, SymphoniaTranscoder,
    TimeoutPolicy, Transcoder,
};

#[derive(Parser)]
#[command(name = "pcmz")]
#[command(version)]
#[command(about = "Lossless 16-bit PCM compressor", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CodecArg {
    /// whole-file delta + Rice
    Delta,
    /// whole-file static Huffman
    Huffman,
    /// block predictive + per-block Rice; keeps the source rate and
    /// channel count unless --ffmpeg is given
    Block,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PredictorArg {
    Constant,
    Linear,
    Lpc,
}

impl From<PredictorArg> for Predictor {
    fn from(arg: PredictorArg) -> Self {
        match arg {
            PredictorArg::Constant => Predictor::Constant,
            PredictorArg::Linear => Predictor::linear(),
            PredictorArg::Lpc => Predictor::lpc(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compress an audio file
    Compress {
        /// Input file (16-bit WAV; any symphonia format with --codec block)
        input: PathBuf,
        /// Output container
        output: PathBuf,
        #[arg(short, long, value_enum, default_value = "delta")]
        codec: CodecArg,
        /// Samples per block (block codec)
        #[arg(long, default_value_t = libpcmz::block::DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Block predictor
        #[arg(long, value_enum, default_value = "constant")]
        predictor: PredictorArg,
        /// Wall-clock budget in seconds (block codec)
        #[arg(long, default_value_t = 30.0)]
        time_budget: f64,
        /// Keep the blocks finished so far when the budget runs out
        #[arg(long)]
        keep_partial: bool,
        /// Extract PCM with this ffmpeg binary instead of symphonia,
        /// converting to 44.1 kHz stereo
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
        /// Store the original unchanged if compression fails
        #[arg(long)]
        fallback: bool,
    },
    /// Decompress a container
    Decompress {
        /// Input container
        input: PathBuf,
        /// Output audio file
        output: PathBuf,
        #[arg(short, long, value_enum, default_value = "delta")]
        codec: CodecArg,
        /// Remux with this ffmpeg binary (block codec)
        #[arg(long)]
        ffmpeg: Option<PathBuf>,
        /// Output container format; anything but wav needs ffmpeg
        #[arg(long, default_value = "wav")]
        format: String,
    },
    /// Show the header of a container
    Info {
        input: PathBuf,
        #[arg(short, long, value_enum, default_value = "delta")]
        codec: CodecArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match cli.command {
        Commands::Compress {
            input,
            output,
            codec,
            block_size,
            predictor,
            time_budget,
            keep_partial,
            ffmpeg,
            fallback,
        } => {
            if !time_budget.is_finite() || time_budget < 0.0 {
                bail!("Invalid time budget: {}", time_budget);
            }
            let config = BlockCodecConfig::default()
                .with_block_size(block_size)
                .with_predictor(predictor.into())
                .with_time_budget(Duration::from_secs_f64(time_budget))
                .with_timeout_policy(if keep_partial {
                    TimeoutPolicy::KeepPartial
                } else {
                    TimeoutPolicy::Fail
                });
            compress(&input, &output, codec, config, ffmpeg, fallback)?;
        }
        Commands::Decompress {
            input,
            output,
            codec,
            ffmpeg,
            format,
        } => {
            decompress(&input, &output, codec, ffmpeg, &format)?;
        }
        Commands::Info { input, codec, json } => {
            info(&input, codec, json)?;
        }
    }

    Ok(())
}

fn in_memory_kind(codec: CodecArg) -> Option<CodecKind> {
    match codec {
        CodecArg::Delta => Some(CodecKind::DeltaRice),
        CodecArg::Huffman => Some(CodecKind::StaticHuffman),
        CodecArg::Block => None,
    }
}

fn transcoder(ffmpeg: Option<PathBuf>, format: &str) -> Box<dyn Transcoder> {
    match ffmpeg {
        Some(program) => Box::new(
            FfmpegTranscoder::new()
                .with_program(program)
                .with_output_format(format),
        ),
        None if !format.eq_ignore_ascii_case("wav") => {
            Box::new(FfmpegTranscoder::new().with_output_format(format))
        }
        None => Box::new(SymphoniaTranscoder),
    }
}

fn compress(
    input: &Path,
    output: &Path,
    codec: CodecArg,
    config: BlockCodecConfig,
    ffmpeg: Option<PathBuf>,
    fallback: bool,
) -> Result<()> {
    println!("Reading {}...", input.display());

    let report = match in_memory_kind(codec) {
        Some(kind) => {
            println!("Compressing ({})...", kind);
            if fallback {
                pcmz::compress_or_store(kind, input, output)?
            } else {
                pcmz::compress_file(kind, input, output)?
            }
        }
        None => {
            println!(
                "Compressing (block, {} samples per block, {} predictor)...",
                config.block_size,
                config.predictor.method().name()
            );
            let codec = BlockCodec::new(config);
            let transcoder = transcoder(ffmpeg, "wav");
            pcmz::compress_block_file(&codec, input, output, transcoder.as_ref(), fallback)?
        }
    };

    print_report(output, &report);
    Ok(())
}

fn decompress(
    input: &Path,
    output: &Path,
    codec: CodecArg,
    ffmpeg: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    println!("Reading {}...", input.display());

    let report = match in_memory_kind(codec) {
        Some(kind) => {
            if !format.eq_ignore_ascii_case("wav") {
                bail!("The {} codec only decompresses to wav", kind);
            }
            println!("Decompressing ({})...", kind);
            pcmz::decompress_file(kind, input, output)?
        }
        None => {
            println!("Decompressing (block)...");
            let transcoder = transcoder(ffmpeg, format);
            pcmz::decompress_block_file(&BlockCodec::default(), input, output, transcoder.as_ref())?
        }
    };

    print_report(output, &report);
    Ok(())
}

fn print_report(output: &Path, report: &FileReport) {
    println!("Done!");
    println!("  Output: {}", output.display());
    if report.stored_original {
        println!("  Stored original unchanged ({} bytes)", report.output_bytes);
        return;
    }
    println!("  Samples: {}", report.samples);
    println!(
        "  Size: {} -> {} bytes ({:.2}x)",
        report.input_bytes,
        report.output_bytes,
        report.ratio()
    );
    if report.partial {
        println!("  Partial: time budget ran out, trailing blocks dropped");
    }
}

fn info(input: &Path, codec: CodecArg, json: bool) -> Result<()> {
    let data = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let info = match in_memory_kind(codec) {
        Some(kind) => pcmz::container_info(kind, &data)?,
        None => pcmz::block_info(&data)?,
    };

    if json {
        let json_str = serde_json::to_string_pretty(&info).context("Failed to serialize info")?;
        println!("{}", json_str);
    } else {
        print_info_readable(&info);
    }
    Ok(())
}

fn print_info_readable(info: &ContainerInfo) {
    println!("pcmz container ({})", info.codec);
    println!("───────────────────────────────");
    println!("  Sample rate: {} Hz", info.sample_rate);
    println!("  Channels:    {}", info.channels);
    println!("  Bit depth:   {}", info.bits_per_sample);
    println!("  Samples:     {}", info.sample_count);
    if let Some(secs) = info.duration_secs {
        println!("  Duration:    {:.2}s", secs);
    }
    if let Some(size) = info.block_size {
        println!("  Block size:  {}", size);
    }
    if let Some(blocks) = info.blocks {
        println!("  Blocks:      {}", blocks);
    }
    println!("  File size:   {} bytes", info.file_size);
}
