//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

use reframe_media::MediaError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Batch-fatal failures.
///
/// Only the initiating probe and output-folder creation abort a run;
/// everything downstream degrades per clip or per planning tier.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to probe source video: {0}")]
    Probe(#[source] MediaError),

    #[error("failed to create clips directory {path}: {source}")]
    CreateClipsDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
