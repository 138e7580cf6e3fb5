//! Face/speaker analysis results.

use serde::{Deserialize, Serialize};

/// Result of one analyzer invocation over a batch of sampled frames.
///
/// This mirrors the JSON payload the external analyzer prints on stdout.
/// All position values are horizontal pixel coordinates in the source frame.
/// Absent fields mean "no signal", not failure: a successful run in
/// active-speaker mode may still carry no speaker center, in which case
/// callers fall back to the next tier rather than erroring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceAnalysis {
    /// Whether the analyzer itself succeeded
    pub ok: bool,

    /// Average face center across frames, if any face was seen
    #[serde(default)]
    pub center_x: Option<f64>,

    /// Two or more faces were seen in at least one frame
    #[serde(default)]
    pub multi_face: bool,

    /// Average center of the dominant speaker track (active-speaker mode)
    #[serde(default)]
    pub speaker_center_x: Option<f64>,

    /// Fraction of face-bearing frames the speaker track appeared in
    #[serde(default)]
    pub speaker_frame_ratio: Option<f64>,

    /// Speaker track's share of total mouth motion across all tracks
    #[serde(default)]
    pub speaker_motion_ratio: Option<f64>,

    /// Per-frame center estimates, one entry per input frame in order.
    /// `None` where no face was found in that frame.
    #[serde(default)]
    pub frame_centers: Vec<Option<f64>>,

    /// Analyzer-reported error message when `ok` is false
    #[serde(default)]
    pub error: Option<String>,
}

impl FaceAnalysis {
    /// A failed analysis carrying an error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Whether the speaker signal passes the confidence gate.
    ///
    /// Both ratios must be present and meet their thresholds; a missing
    /// ratio fails the gate.
    pub fn speaker_gate_passes(&self, min_frame_ratio: f64, min_motion_ratio: f64) -> bool {
        self.speaker_center_x.is_some()
            && self.speaker_frame_ratio.is_some_and(|r| r >= min_frame_ratio)
            && self
                .speaker_motion_ratio
                .is_some_and(|r| r >= min_motion_ratio)
    }
}
