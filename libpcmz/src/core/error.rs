//! error types for the pcmz codecs

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while compressing or decompressing.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Input is not 16-bit PCM or has no usable WAV header.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Container bytes are truncated, malformed or inconsistent.
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    /// Decoded sample count differs from the count in the header.
    #[error("Sample count mismatch: header says {expected}, decoded {actual}")]
    SampleCountMismatch {
        /// Count recorded in the container.
        expected: usize,
        /// Count actually decoded.
        actual: usize,
    },

    /// Input is larger than the configured ceiling.
    #[error("Input of {size} bytes exceeds the {limit} byte limit")]
    SizeLimitExceeded {
        /// Input size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// Wall-clock budget ran out.
    #[error("Time budget of {budget:?} exceeded during {phase}")]
    Timeout {
        /// Phase that noticed the overrun.
        phase: &'static str,
        /// Configured budget.
        budget: Duration,
    },

    /// The external transcoder failed or produced nothing.
    #[error("External tool failure: {0}")]
    ExternalToolFailure(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fault that valid input can never trigger.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CodecError {
    /// True for fail-closed validation errors caused by the input itself,
    /// false for environment and internal faults.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CodecError::UnsupportedFormat(_)
                | CodecError::CorruptContainer(_)
                | CodecError::SampleCountMismatch { .. }
                | CodecError::SizeLimitExceeded { .. }
        )
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        CodecError::CorruptContainer(msg.into())
    }
}

/// result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
