//! Face/speaker analyzer capability and its implementations.
//!
//! The analyzer is a polymorphic capability: the crop planners talk to a
//! `FaceAnalyzer` trait object and never care which backend produced the
//! estimate. Two implementations exist:
//!
//! - [`ExternalFaceAnalyzer`]: the primary backend; invokes the external
//!   detection program over a batch of frame paths and parses its JSON.
//! - [`FallbackFaceDetector`]: a simpler in-process detector used as a
//!   last-resort tier before giving up to geometric centering. Requires the
//!   `opencv` feature; without it the tier reports itself unavailable.

mod external;
mod fallback;

pub use external::{AnalyzerCommand, ExternalFaceAnalyzer};
pub use fallback::FallbackFaceDetector;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::MediaResult;
use reframe_models::FaceAnalysis;

/// Capability for estimating face/speaker positions from sampled frames.
#[async_trait]
pub trait FaceAnalyzer: Send + Sync {
    /// Analyze a batch of frame images, in order.
    ///
    /// When `active_speaker` is requested but the backend has no
    /// speaker-specific signal, the result still comes back with
    /// `ok = true` and an absent `speaker_center_x`; callers treat absence
    /// as "fall back", never as an error.
    async fn analyze(
        &self,
        frame_paths: &[PathBuf],
        active_speaker: bool,
    ) -> MediaResult<FaceAnalysis>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
