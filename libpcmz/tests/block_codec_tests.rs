//! File-level tests for the block codec, driven through the WAV transcoder.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use libpcmz::block::DEFAULT_BLOCK_SIZE;
use libpcmz::{
    wav, BlockCodec, BlockCodecConfig, BlockDocument, CodecError, CodecResult, ExtractedPcm,
    Predictor, PredictorMethod, Stored, TimeoutPolicy, Transcoder, WavFormat, WavTranscoder,
};

fn write_wav(dir: &Path, name: &str, samples: &[i16], sample_rate: u32, channels: u16) -> PathBuf {
    let path = dir.join(name);
    let format = WavFormat {
        sample_rate,
        channels,
        bits_per_sample: 16,
    };
    fs::write(&path, wav::write(format, samples)).unwrap();
    path
}

fn ramp(len: usize) -> Vec<i16> {
    (0..len).map(|i| ((i * 97) % 6000) as i16 - 3000).collect()
}

/// Transcoder that takes longer than any sensible budget to extract.
struct SlowTranscoder(Duration);

impl Transcoder for SlowTranscoder {
    fn extract_pcm(&self, input: &Path, rate: u32, channels: u16) -> CodecResult<ExtractedPcm> {
        std::thread::sleep(self.0);
        WavTranscoder.extract_pcm(input, rate, channels)
    }

    fn remux_pcm(&self, pcm: &[u8], rate: u32, channels: u16) -> CodecResult<Vec<u8>> {
        WavTranscoder.remux_pcm(pcm, rate, channels)
    }
}

/// Transcoder whose decoded PCM is much larger than the file it reads,
/// like a compressed source.
struct InflatingTranscoder {
    samples: Vec<i16>,
}

impl Transcoder for InflatingTranscoder {
    fn extract_pcm(&self, _input: &Path, rate: u32, channels: u16) -> CodecResult<ExtractedPcm> {
        Ok(ExtractedPcm {
            pcm: wav::samples_to_bytes(&self.samples),
            sample_rate: rate,
            channels,
        })
    }

    fn remux_pcm(&self, pcm: &[u8], rate: u32, channels: u16) -> CodecResult<Vec<u8>> {
        WavTranscoder.remux_pcm(pcm, rate, channels)
    }
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let samples = ramp(5000);
    let input = write_wav(dir.path(), "in.wav", &samples, 44100, 2);
    let packed = dir.path().join("out.pcmz");
    let restored = dir.path().join("restored.wav");

    let codec = BlockCodec::default();
    let report = codec.compress_file(&input, &packed, &WavTranscoder).unwrap();
    assert_eq!(report.samples, 5000);
    assert_eq!(report.blocks, 5000_usize.div_ceil(DEFAULT_BLOCK_SIZE));
    assert!(!report.partial);

    let back = codec.decompress_file(&packed, &restored, &WavTranscoder).unwrap();
    assert_eq!(back.samples, 5000);
    assert_eq!(fs::read(&restored).unwrap(), fs::read(&input).unwrap());
}

#[test]
fn test_every_predictor_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let samples: Vec<i16> = (0..3000)
        .map(|i| ((i as f64 * 0.031).sin() * 30000.0) as i16)
        .collect();
    let input = write_wav(dir.path(), "in.wav", &samples, 48000, 1);

    for predictor in [Predictor::Constant, Predictor::linear(), Predictor::lpc()] {
        let method = predictor.method();
        let codec = BlockCodec::new(
            BlockCodecConfig::default()
                .with_block_size(700)
                .with_predictor(predictor),
        );
        let packed = dir.path().join(format!("{}.pcmz", method.name()));
        let restored = dir.path().join(format!("{}.wav", method.name()));

        codec.compress_file(&input, &packed, &WavTranscoder).unwrap();
        let document = BlockDocument::from_bytes(&fs::read(&packed).unwrap()).unwrap();
        assert!(document.blocks.iter().all(|b| b.method == method));

        codec.decompress_file(&packed, &restored, &WavTranscoder).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), fs::read(&input).unwrap());
    }
}

#[test]
fn test_ten_samples_make_one_block() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "short.wav", &ramp(10), 44100, 2);
    let packed = dir.path().join("short.pcmz");

    BlockCodec::default()
        .compress_file(&input, &packed, &WavTranscoder)
        .unwrap();

    let document = BlockDocument::from_bytes(&fs::read(&packed).unwrap()).unwrap();
    assert_eq!(document.blocks.len(), 1);
    let block = &document.blocks[0];
    assert_eq!(block.sample_count, 10);
    assert_eq!(block.method, PredictorMethod::Constant);
    assert!((1..=15).contains(&block.rice.parameter));
    assert_eq!(document.metadata.algorithm, "block-rice");
    assert_eq!(document.metadata.block_size, 1024);
}

#[test]
fn test_inspect_reads_metadata() {
    let codec = BlockCodec::default();
    let (blob, report) = codec
        .compress_pcm(&wav::samples_to_bytes(&ramp(100)), 32000, 1)
        .unwrap();
    assert!(!report.partial);
    let meta = codec.inspect(&blob).unwrap();
    assert_eq!(meta.sample_rate, 32000);
    assert_eq!(meta.channels, 1);
    assert_eq!(meta.bits_per_sample, 16);
}

// ============================================================================
// Guards
// ============================================================================

#[test]
fn test_oversize_input_rejected_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "big.wav", &ramp(1000), 44100, 2);
    let packed = dir.path().join("big.pcmz");

    let codec = BlockCodec::new(BlockCodecConfig::default().with_max_input_bytes(1024));
    let err = codec
        .compress_file(&input, &packed, &WavTranscoder)
        .unwrap_err();

    match err {
        CodecError::SizeLimitExceeded { size, limit } => {
            assert_eq!(size, 44 + 2000);
            assert_eq!(limit, 1024);
        }
        other => panic!("expected SizeLimitExceeded, got {:?}", other),
    }
    assert!(!packed.exists());
}

#[test]
fn test_ceiling_applies_to_input_file_not_decoded_pcm() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("small.bin");
    fs::write(&input, vec![0u8; 500]).unwrap();
    let packed = dir.path().join("small.pcmz");

    let codec = BlockCodec::new(BlockCodecConfig::default().with_max_input_bytes(1024));
    let transcoder = InflatingTranscoder {
        samples: ramp(2000),
    };
    let report = codec.compress_file(&input, &packed, &transcoder).unwrap();

    assert_eq!(report.input_bytes, 500);
    assert_eq!(report.samples, 2000);
    let document = BlockDocument::from_bytes(&fs::read(&packed).unwrap()).unwrap();
    assert_eq!(document.sample_count(), 2000);
}

#[test]
fn test_default_ceiling_is_25_mib() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("huge.bin");
    let file = fs::File::create(&input).unwrap();
    file.set_len(25 * 1024 * 1024 + 1).unwrap();
    let packed = dir.path().join("huge.pcmz");

    let err = BlockCodec::default()
        .compress_file(&input, &packed, &WavTranscoder)
        .unwrap_err();
    assert!(matches!(err, CodecError::SizeLimitExceeded { .. }));
    assert!(!packed.exists());
}

#[test]
fn test_extraction_timeout_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "in.wav", &ramp(100), 44100, 2);
    let packed = dir.path().join("out.pcmz");

    let codec = BlockCodec::new(
        BlockCodecConfig::default()
            .with_time_budget(Duration::from_millis(1))
            .with_timeout_policy(TimeoutPolicy::KeepPartial),
    );
    let err = codec
        .compress_file(&input, &packed, &SlowTranscoder(Duration::from_millis(20)))
        .unwrap_err();

    match err {
        CodecError::Timeout { phase, .. } => assert_eq!(phase, "pcm extraction"),
        other => panic!("expected Timeout, got {:?}", other),
    }
    assert!(!packed.exists());
}

#[test]
fn test_zero_budget_fail_policy() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "in.wav", &ramp(4000), 44100, 2);
    let packed = dir.path().join("out.pcmz");

    let codec = BlockCodec::new(BlockCodecConfig::default().with_time_budget(Duration::ZERO));
    let err = codec
        .compress_file(&input, &packed, &WavTranscoder)
        .unwrap_err();
    assert!(matches!(err, CodecError::Timeout { .. }));
    assert!(!packed.exists());
}

#[test]
fn test_zero_budget_keep_partial_policy() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "in.wav", &ramp(4000), 44100, 2);
    let packed = dir.path().join("out.pcmz");
    let restored = dir.path().join("restored.wav");

    let codec = BlockCodec::new(
        BlockCodecConfig::default()
            .with_block_size(100)
            .with_timeout_policy(TimeoutPolicy::KeepPartial),
    );
    let deadline = libpcmz::block::Deadline::start(Duration::ZERO);
    let (document, partial) = codec
        .encode_pcm(&wav::samples_to_bytes(&ramp(4000)), 44100, 2, &deadline)
        .unwrap();
    assert!(partial);
    assert!(document.sample_count() < 4000);

    // a generous budget still packages everything
    let report = codec.compress_file(&input, &packed, &WavTranscoder).unwrap();
    assert!(!report.partial);
    codec
        .decompress_file(&packed, &restored, &WavTranscoder)
        .unwrap();
    assert_eq!(fs::read(&restored).unwrap(), fs::read(&input).unwrap());
}

// ============================================================================
// Corruption and fallback
// ============================================================================

#[test]
fn test_corrupt_container_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let packed = dir.path().join("bad.pcmz");
    fs::write(&packed, [0, 0, 0, 9, 1, 2, 3]).unwrap();
    let restored = dir.path().join("restored.wav");

    let err = BlockCodec::default()
        .decompress_file(&packed, &restored, &WavTranscoder)
        .unwrap_err();
    assert!(matches!(err, CodecError::CorruptContainer(_)));
    assert!(!restored.exists());
}

#[test]
fn test_compress_or_store_copies_original() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, b"not audio at all, but worth keeping").unwrap();
    let output = dir.path().join("notes.pcmz");

    let stored = BlockCodec::default()
        .compress_or_store(&input, &output, &WavTranscoder)
        .unwrap();

    assert!(matches!(stored, Stored::Original { .. }));
    assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());
}

#[test]
fn test_compress_or_store_compresses_when_it_can() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_wav(dir.path(), "in.wav", &ramp(2048), 22050, 1);
    let output = dir.path().join("in.pcmz");

    let stored = BlockCodec::default()
        .compress_or_store(&input, &output, &WavTranscoder)
        .unwrap();

    match stored {
        Stored::Compressed(report) => assert_eq!(report.samples, 2048),
        other => panic!("expected Compressed, got {:?}", other),
    }
    assert!(BlockDocument::from_bytes(&fs::read(&output).unwrap()).is_ok());
}
