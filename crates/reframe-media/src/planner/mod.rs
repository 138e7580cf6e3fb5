//! Crop planning: static (whole-video) and dynamic (per-clip) planners.

mod dynamic_plan;
mod static_plan;

pub use dynamic_plan::{merge_short_segments, smooth_centers, DynamicCropPlanner};
pub use static_plan::StaticCropPlanner;

use serde::{Deserialize, Serialize};

use reframe_models::{largest_even, round_even, VideoDimensions};

/// Tunable planning parameters.
///
/// The thresholds are empirically chosen; they are configuration, not
/// constants baked into the algorithms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Crop aspect ratio numerator (width part)
    pub aspect_width: u32,
    /// Crop aspect ratio denominator (height part)
    pub aspect_height: u32,
    /// Minimum fraction of face-bearing frames the speaker track must
    /// appear in before its center is trusted
    pub min_speaker_frame_ratio: f64,
    /// Minimum share of total mouth motion the speaker track must carry
    pub min_speaker_motion_ratio: f64,
    /// Center deltas below this fraction of the crop width are treated as
    /// detector noise, not subject movement
    pub jitter_fraction: f64,
    /// Segments shorter than this are merged away
    pub min_segment_secs: f64,
    /// Exponential smoothing factor for per-instant centers
    pub smoothing_alpha: f64,
    /// Frames sampled for a whole-video static plan
    pub static_sample_frames: usize,
    /// Frames sampled for a whole-video plan in active-speaker mode
    pub speaker_sample_frames: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            // Slightly wider than strict 9:16 to reduce over-cropping
            aspect_width: 10,
            aspect_height: 16,
            min_speaker_frame_ratio: 0.6,
            min_speaker_motion_ratio: 0.55,
            jitter_fraction: 0.16,
            min_segment_secs: 0.9,
            smoothing_alpha: 0.6,
            static_sample_frames: 3,
            speaker_sample_frames: 9,
        }
    }
}

impl PlannerConfig {
    /// Crop window dimensions for a source frame: full even height, width
    /// from the configured aspect ratio, clamped to the frame.
    pub fn crop_dims(&self, dims: &VideoDimensions) -> (u32, u32) {
        let crop_height = largest_even(dims.height);
        let ideal_width =
            crop_height as f64 * self.aspect_width as f64 / self.aspect_height as f64;
        let crop_width = round_even(ideal_width).min(largest_even(dims.width));
        (crop_width, crop_height)
    }

    /// Absolute jitter threshold in pixels for a given crop width.
    pub fn jitter_threshold(&self, crop_width: u32) -> f64 {
        self.jitter_fraction * crop_width as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_dims_landscape() {
        let config = PlannerConfig::default();
        let (w, h) = config.crop_dims(&VideoDimensions::new(1920, 1080, None));
        // 1080 * 10/16 = 675 rounds even to 676
        assert_eq!((w, h), (676, 1080));
    }

    #[test]
    fn test_crop_dims_always_even() {
        let config = PlannerConfig::default();
        let (w, h) = config.crop_dims(&VideoDimensions::new(1921, 1081, None));
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
        assert!(w <= 1920);
        assert!(h <= 1080);
    }

    #[test]
    fn test_crop_dims_narrow_source_clamped() {
        let config = PlannerConfig::default();
        // Source narrower than the ideal crop: width pins to the frame
        let (w, h) = config.crop_dims(&VideoDimensions::new(500, 1080, None));
        assert_eq!(w, 500);
        assert_eq!(h, 1080);
    }

    #[test]
    fn test_jitter_threshold() {
        let config = PlannerConfig::default();
        assert!((config.jitter_threshold(676) - 108.16).abs() < 1e-9);
    }
}
