//! Whole-video static crop planning with a layered fallback chain.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::PlannerConfig;
use crate::analyzer::FaceAnalyzer;
use crate::frames::sample_distributed;
use reframe_models::{clamp_crop_x, FaceAnalysis, StaticCropPlan, VideoDimensions};

/// Derives one crop window for an entire video.
///
/// The planner is infallible by design: every failure tier degrades to the
/// next one, down to geometric centering. A wrong crop that cuts the subject
/// off costs more than a centered, non-ideal one, so a plan is always
/// produced and never an unrecoverable error.
pub struct StaticCropPlanner<'a> {
    config: &'a PlannerConfig,
    primary: &'a dyn FaceAnalyzer,
    secondary: Option<&'a dyn FaceAnalyzer>,
}

/// Where the chosen center came from.
struct ResolvedCenter {
    center_x: f64,
    used_analyzer: bool,
    speaker_resolved: bool,
}

impl<'a> StaticCropPlanner<'a> {
    pub fn new(
        config: &'a PlannerConfig,
        primary: &'a dyn FaceAnalyzer,
        secondary: Option<&'a dyn FaceAnalyzer>,
    ) -> Self {
        Self {
            config,
            primary,
            secondary,
        }
    }

    /// Compute the crop plan for `video_path`.
    pub async fn plan(
        &self,
        video_path: &Path,
        dims: &VideoDimensions,
        active_speaker: bool,
    ) -> StaticCropPlan {
        let sample_count = if active_speaker {
            self.config.speaker_sample_frames
        } else {
            self.config.static_sample_frames
        };

        let frames =
            match sample_distributed(video_path, dims.duration_secs, sample_count).await {
                Ok(frames) => frames,
                Err(e) => {
                    // A failed capture aborts analysis, not the plan
                    warn!("Frame sampling failed, using geometric center: {}", e);
                    return self.geometric_plan(dims, active_speaker);
                }
            };

        let analysis = match self.primary.analyze(frames.paths(), active_speaker).await {
            Ok(a) => a,
            Err(e) => {
                warn!("Analyzer invocation failed, using geometric center: {}", e);
                return self.geometric_plan(dims, active_speaker);
            }
        };

        self.plan_from_analysis(&analysis, frames.paths(), dims, active_speaker)
            .await
    }

    /// Apply the decision tree to an analysis result.
    ///
    /// Separated from `plan` so the decision logic is exercised without
    /// spawning FFmpeg.
    async fn plan_from_analysis(
        &self,
        analysis: &FaceAnalysis,
        frame_paths: &[PathBuf],
        dims: &VideoDimensions,
        active_speaker: bool,
    ) -> StaticCropPlan {
        if !analysis.ok {
            warn!(error = ?analysis.error, "Analyzer reported failure, using geometric center");
            return self.geometric_plan(dims, active_speaker);
        }

        let (crop_width, crop_height) = self.config.crop_dims(dims);

        let mut multi_face = analysis.multi_face;
        let resolved = self
            .resolve_center(analysis, frame_paths, dims, active_speaker, &mut multi_face)
            .await;

        // Multiple subjects and no confident speaker signal: cropping risks
        // cutting someone out of frame, so keep the full frame. Applies in
        // both modes.
        if multi_face && !resolved.speaker_resolved {
            info!("Multiple faces without a confident speaker, keeping full frame");
            return StaticCropPlan {
                multi_face_detected: true,
                used_analyzer: resolved.used_analyzer,
                ..StaticCropPlan::full_frame(dims.width, dims.height, active_speaker)
            };
        }

        let crop_x = clamp_crop_x(resolved.center_x, crop_width, dims.width);
        let plan = StaticCropPlan {
            crop_width,
            crop_height,
            crop_x,
            needs_crop: crop_width < dims.width,
            used_analyzer: resolved.used_analyzer,
            multi_face_detected: multi_face,
            active_speaker_mode: active_speaker,
        };

        debug!(
            crop_width,
            crop_height,
            crop_x,
            used_analyzer = plan.used_analyzer,
            "Static crop plan ready"
        );
        plan
    }

    /// Walk the tiers: confident speaker center, generic center, secondary
    /// detector, geometric center.
    async fn resolve_center(
        &self,
        analysis: &FaceAnalysis,
        frame_paths: &[PathBuf],
        dims: &VideoDimensions,
        active_speaker: bool,
        multi_face: &mut bool,
    ) -> ResolvedCenter {
        if active_speaker
            && analysis.speaker_gate_passes(
                self.config.min_speaker_frame_ratio,
                self.config.min_speaker_motion_ratio,
            )
        {
            let center_x = analysis.speaker_center_x.expect("gated on presence");
            debug!(center_x, "Speaker center passed confidence gate");
            return ResolvedCenter {
                center_x,
                used_analyzer: true,
                speaker_resolved: true,
            };
        }

        if let Some(center_x) = analysis.center_x {
            debug!(center_x, "Using generic face center");
            return ResolvedCenter {
                center_x,
                used_analyzer: true,
                speaker_resolved: false,
            };
        }

        if let Some(secondary) = self.secondary {
            match secondary.analyze(frame_paths, false).await {
                Ok(result) if result.ok => {
                    *multi_face |= result.multi_face;
                    if let Some(center_x) = result.center_x {
                        debug!(
                            center_x,
                            detector = secondary.name(),
                            "Secondary detector center"
                        );
                        return ResolvedCenter {
                            center_x,
                            used_analyzer: true,
                            speaker_resolved: false,
                        };
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Secondary detector unavailable: {}", e);
                }
            }
        }

        ResolvedCenter {
            center_x: dims.center_x(),
            used_analyzer: false,
            speaker_resolved: false,
        }
    }

    fn geometric_plan(&self, dims: &VideoDimensions, active_speaker: bool) -> StaticCropPlan {
        let (crop_width, crop_height) = self.config.crop_dims(dims);
        StaticCropPlan {
            crop_width,
            crop_height,
            crop_x: clamp_crop_x(dims.center_x(), crop_width, dims.width),
            needs_crop: crop_width < dims.width,
            used_analyzer: false,
            multi_face_detected: false,
            active_speaker_mode: active_speaker,
        }
    }
}
