//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during probing, analysis, planning, and extraction.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFprobe failed: {message}")]
    ProbeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Frame extraction failed at {timestamp:.3}s: {message}")]
    FrameExtraction { timestamp: f64, message: String },

    #[error("Face analyzer failed: {message}")]
    AnalyzerFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Face detection unavailable: {0}")]
    DetectionUnavailable(String),

    #[error("FFmpeg command failed: {message}")]
    EncodeFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Encoded output too small: {path} ({size} bytes)")]
    OutputTooSmall { path: PathBuf, size: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a probe failure error.
    pub fn probe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ProbeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an analyzer failure error.
    pub fn analyzer_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::AnalyzerFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an FFmpeg encode failure error.
    pub fn encode_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }
}
