//! Crop plans and window geometry.

use serde::{Deserialize, Serialize};

/// How output clips should be framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropMode {
    /// Keep the original framing, no crop
    #[default]
    Off,
    /// One portrait crop window for the whole video
    Portrait,
    /// Portrait crop that follows the active speaker, may move per clip
    ActiveSpeaker,
}

impl CropMode {
    /// Derive the mode from the caller's flags. The active-speaker flag is
    /// only meaningful when portrait cropping is requested.
    pub fn from_flags(portrait_crop: bool, active_speaker_crop: bool) -> Self {
        match (portrait_crop, active_speaker_crop) {
            (false, _) => CropMode::Off,
            (true, false) => CropMode::Portrait,
            (true, true) => CropMode::ActiveSpeaker,
        }
    }

    pub fn is_active_speaker(&self) -> bool {
        matches!(self, CropMode::ActiveSpeaker)
    }
}

/// Round down to the nearest even value. Codecs reject odd plane sizes.
pub fn largest_even(v: u32) -> u32 {
    v & !1
}

/// Round to the nearest even value.
pub fn round_even(v: f64) -> u32 {
    ((v / 2.0).round() as u32) * 2
}

/// Left edge of a crop window centered on `center_x`, clamped inside the frame.
pub fn clamp_crop_x(center_x: f64, crop_width: u32, frame_width: u32) -> u32 {
    let max_x = frame_width.saturating_sub(crop_width);
    let x = (center_x - crop_width as f64 / 2.0).floor();
    (x.max(0.0) as u32).min(max_x)
}

/// A single crop window applied to an entire video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticCropPlan {
    /// Crop width in pixels (even)
    pub crop_width: u32,
    /// Crop height in pixels (even)
    pub crop_height: u32,
    /// Left edge of the crop window
    pub crop_x: u32,
    /// Whether cropping should be applied at all
    pub needs_crop: bool,
    /// A detector (primary or secondary) supplied the center
    pub used_analyzer: bool,
    /// Multiple faces were seen during analysis
    pub multi_face_detected: bool,
    /// The plan was computed in active-speaker mode
    pub active_speaker_mode: bool,
}

impl StaticCropPlan {
    /// A plan that keeps the full frame untouched.
    pub fn full_frame(width: u32, height: u32, active_speaker_mode: bool) -> Self {
        Self {
            crop_width: width,
            crop_height: height,
            crop_x: 0,
            needs_crop: false,
            used_analyzer: false,
            multi_face_detected: false,
            active_speaker_mode,
        }
    }
}

/// A time interval within a clip during which the crop window is held fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSegment {
    /// Segment start, in source-video seconds
    pub start_secs: f64,
    /// Segment end, in source-video seconds (exclusive, > start)
    pub end_secs: f64,
    /// Horizontal subject center the window is placed around
    pub center_x: f64,
}

impl CropSegment {
    pub fn new(start_secs: f64, end_secs: f64, center_x: f64) -> Self {
        Self {
            start_secs,
            end_secs,
            center_x,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// A crop window that may move over a clip's duration.
///
/// Segments are ordered, contiguous, non-overlapping, and together span
/// exactly the clip's time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicCropPlan {
    /// Crop width in pixels (even)
    pub crop_width: u32,
    /// Crop height in pixels (even)
    pub crop_height: u32,
    /// Per-interval crop centers, never empty
    pub segments: Vec<CropSegment>,
}

impl DynamicCropPlan {
    /// Whether the plan degenerates to a single fixed window.
    pub fn is_static(&self) -> bool {
        self.segments.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_mode_from_flags() {
        assert_eq!(CropMode::from_flags(false, false), CropMode::Off);
        // Active-speaker flag without portrait is meaningless
        assert_eq!(CropMode::from_flags(false, true), CropMode::Off);
        assert_eq!(CropMode::from_flags(true, false), CropMode::Portrait);
        assert_eq!(CropMode::from_flags(true, true), CropMode::ActiveSpeaker);
    }

    #[test]
    fn test_largest_even() {
        assert_eq!(largest_even(1080), 1080);
        assert_eq!(largest_even(1081), 1080);
        assert_eq!(largest_even(1), 0);
    }

    #[test]
    fn test_round_even() {
        // 1080 * 10/16 = 675 rounds up to 676
        assert_eq!(round_even(675.0), 676);
        assert_eq!(round_even(674.9), 674);
        assert_eq!(round_even(676.0), 676);
    }

    #[test]
    fn test_clamp_crop_x_inside() {
        // Worked example: 1920 wide, 676 crop, center 960
        assert_eq!(clamp_crop_x(960.0, 676, 1920), 622);
    }

    #[test]
    fn test_clamp_crop_x_at_edges() {
        assert_eq!(clamp_crop_x(0.0, 676, 1920), 0);
        assert_eq!(clamp_crop_x(1920.0, 676, 1920), 1244);
        // Crop as wide as the frame pins to zero
        assert_eq!(clamp_crop_x(960.0, 1920, 1920), 0);
    }

    #[test]
    fn test_full_frame_plan() {
        let plan = StaticCropPlan::full_frame(1920, 1080, false);
        assert!(!plan.needs_crop);
        assert_eq!(plan.crop_width, 1920);
        assert_eq!(plan.crop_x, 0);
    }
}
