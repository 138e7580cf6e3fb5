//! Run configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use reframe_media::{AnalyzerCommand, PlannerConfig};
use reframe_models::EncodingConfig;

/// Configuration for one clipping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Directory the output clips are written to (created if missing)
    pub clips_dir: PathBuf,

    /// Crop each clip to a portrait window
    pub portrait_crop: bool,

    /// Center the crop on the active speaker; only meaningful when
    /// `portrait_crop` is set
    pub active_speaker_crop: bool,

    /// How to invoke the external face/speaker analyzer
    pub analyzer: AnalyzerCommand,

    /// Crop planning parameters
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Encoding settings for the re-encode paths
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Per-encode timeout in seconds, unlimited when absent
    #[serde(default)]
    pub encode_timeout_secs: Option<u64>,
}

impl RunOptions {
    pub fn new(clips_dir: impl Into<PathBuf>, analyzer: AnalyzerCommand) -> Self {
        Self {
            clips_dir: clips_dir.into(),
            portrait_crop: false,
            active_speaker_crop: false,
            analyzer,
            planner: PlannerConfig::default(),
            encoding: EncodingConfig::default(),
            encode_timeout_secs: None,
        }
    }

    /// Enable portrait cropping.
    pub fn with_portrait_crop(mut self, enabled: bool) -> Self {
        self.portrait_crop = enabled;
        self
    }

    /// Enable active-speaker centering.
    pub fn with_active_speaker_crop(mut self, enabled: bool) -> Self {
        self.active_speaker_crop = enabled;
        self
    }

    /// Set the per-encode timeout.
    pub fn with_encode_timeout(mut self, secs: u64) -> Self {
        self.encode_timeout_secs = Some(secs);
        self
    }
}
