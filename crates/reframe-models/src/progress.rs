//! Progress events and run output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::clip::ClipResult;

/// Emitted before each clip starts processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipProgress {
    /// 1-based index of the clip about to start
    pub current: usize,
    /// Total clips in the batch
    pub total: usize,
    /// Title of the clip about to start
    pub title: String,
}

/// Output of a full clipping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClippingRun {
    /// Directory the clips were written to
    pub clips_dir: PathBuf,
    /// Per-clip outcomes, in request order
    pub clips: Vec<ClipResult>,
    /// The run was cancelled before all clips were processed
    #[serde(default)]
    pub cancelled: bool,
}

impl ClippingRun {
    pub fn succeeded(&self) -> usize {
        self.clips.iter().filter(|c| c.success).count()
    }

    pub fn failed(&self) -> usize {
        self.clips.iter().filter(|c| !c.success).count()
    }
}
