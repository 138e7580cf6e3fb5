//! The clipping run driver.
//!
//! Clips are processed strictly sequentially: every step shells out to a
//! CPU/IO-heavy external process, and concurrent encodes would contend for
//! the same machine without a throughput win at typical batch sizes.

use std::path::Path;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::RunOptions;
use crate::error::{PipelineError, PipelineResult};
use reframe_media::{
    probe_video, ClipExtractor, DynamicCropPlanner, ExternalFaceAnalyzer, ExtractionMode,
    FaceAnalyzer, FallbackFaceDetector, MediaError, StaticCropPlanner,
};
use reframe_models::{
    ClipProgress, ClipResult, ClipSpec, ClippingRun, CropMode, StaticCropPlan, VideoDimensions,
};

/// Runs a batch of clip extractions against one source video.
pub struct ClippingPipeline {
    options: RunOptions,
}

impl ClippingPipeline {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Process `specs` in order, emitting a progress event before each clip.
    ///
    /// A single clip's failure never aborts the batch; only the initial
    /// probe and output-folder creation are fatal. When `cancel_rx` flips to
    /// true the in-flight encode is killed, no further clips are processed,
    /// and any partially written file is left in place for the caller.
    pub async fn run(
        &self,
        video_path: &Path,
        specs: &[ClipSpec],
        mut progress: impl FnMut(ClipProgress),
        cancel_rx: Option<watch::Receiver<bool>>,
    ) -> PipelineResult<ClippingRun> {
        let dims = probe_video(video_path)
            .await
            .map_err(PipelineError::Probe)?;

        tokio::fs::create_dir_all(&self.options.clips_dir)
            .await
            .map_err(|source| PipelineError::CreateClipsDir {
                path: self.options.clips_dir.clone(),
                source,
            })?;

        let crop_mode =
            CropMode::from_flags(self.options.portrait_crop, self.options.active_speaker_crop);

        let primary = ExternalFaceAnalyzer::new(self.options.analyzer.clone());
        let secondary = FallbackFaceDetector::new();

        let static_plan = match crop_mode {
            CropMode::Off => None,
            mode => {
                let planner = StaticCropPlanner::new(
                    &self.options.planner,
                    &primary,
                    Some(&secondary as &dyn FaceAnalyzer),
                );
                let plan = planner
                    .plan(video_path, &dims, mode.is_active_speaker())
                    .await;
                info!(
                    needs_crop = plan.needs_crop,
                    used_analyzer = plan.used_analyzer,
                    multi_face = plan.multi_face_detected,
                    "Computed whole-video crop plan"
                );
                Some(plan)
            }
        };

        let mut extractor = ClipExtractor::new(self.options.encoding.clone());
        if let Some(rx) = &cancel_rx {
            extractor = extractor.with_cancel(rx.clone());
        }
        if let Some(secs) = self.options.encode_timeout_secs {
            extractor = extractor.with_timeout(secs);
        }

        let mut clips = Vec::with_capacity(specs.len());
        let mut cancelled = false;

        for (index, spec) in specs.iter().enumerate() {
            if cancel_rx.as_ref().is_some_and(|rx| *rx.borrow()) {
                info!("Run cancelled before clip {}", index + 1);
                cancelled = true;
                break;
            }

            progress(ClipProgress {
                current: index + 1,
                total: specs.len(),
                title: spec.title.clone(),
            });

            if spec.end_secs <= spec.start_secs {
                warn!(title = %spec.title, "Skipping clip with non-positive duration");
                clips.push(ClipResult::failed(
                    index,
                    spec,
                    "clip end does not exceed start",
                ));
                continue;
            }

            let result = self
                .process_clip(
                    video_path,
                    &dims,
                    crop_mode,
                    static_plan.as_ref(),
                    &primary,
                    &extractor,
                    index,
                    spec,
                )
                .await;

            let was_cancelled =
                !result.success && result.error.as_deref() == Some(CANCELLED_ERROR);

            clips.push(result);

            if was_cancelled {
                cancelled = true;
                break;
            }
        }

        Ok(ClippingRun {
            clips_dir: self.options.clips_dir.clone(),
            clips,
            cancelled,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_clip(
        &self,
        video_path: &Path,
        dims: &VideoDimensions,
        crop_mode: CropMode,
        static_plan: Option<&StaticCropPlan>,
        primary: &dyn FaceAnalyzer,
        extractor: &ClipExtractor,
        index: usize,
        spec: &ClipSpec,
    ) -> ClipResult {
        let output = self.options.clips_dir.join(spec.output_filename(index));

        // Active-speaker clips get their own time-varying plan; everything
        // else reuses the whole-video decision.
        let dynamic_plan = match (crop_mode, static_plan) {
            (CropMode::ActiveSpeaker, Some(plan)) if plan.needs_crop => {
                let planner = DynamicCropPlanner::new(&self.options.planner, primary);
                Some(
                    planner
                        .plan(video_path, dims, spec.start_secs, spec.end_secs, true)
                        .await,
                )
            }
            _ => None,
        };

        let mode = match (crop_mode, static_plan, &dynamic_plan) {
            (CropMode::Off, _, _) => ExtractionMode::CopyOnly,
            (_, Some(plan), None) if plan.needs_crop => ExtractionMode::StaticCrop(plan),
            (_, _, Some(plan)) => ExtractionMode::DynamicCrop {
                plan,
                frame_width: dims.width,
            },
            _ => ExtractionMode::CopyOnly,
        };

        match extractor
            .extract(video_path, &output, spec.start_secs, spec.end_secs, mode)
            .await
        {
            Ok(()) => {
                let thumb = output.with_extension("jpg");
                if let Err(e) = reframe_media::generate_thumbnail(&output, &thumb).await {
                    warn!("Failed to generate thumbnail: {}", e);
                }
                info!(clip = %output.display(), "Clip ready");
                ClipResult::ok(index, spec, output)
            }
            Err(MediaError::Cancelled) => {
                info!(title = %spec.title, "Clip extraction cancelled");
                ClipResult::failed(index, spec, CANCELLED_ERROR)
            }
            Err(e) => {
                warn!(title = %spec.title, "Clip extraction failed: {}", e);
                ClipResult::failed(index, spec, e.to_string())
            }
        }
    }
}

const CANCELLED_ERROR: &str = "cancelled";

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_media::AnalyzerCommand;

    fn options(clips_dir: &Path) -> RunOptions {
        RunOptions::new(clips_dir, AnalyzerCommand::new("true", vec![]))
    }

    #[tokio::test]
    async fn test_missing_source_is_batch_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ClippingPipeline::new(options(&dir.path().join("clips")));

        let specs = vec![ClipSpec::new("A", 0.0, 10.0)];
        let err = pipeline
            .run(Path::new("/nonexistent/video.mp4"), &specs, |_| {}, None)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Probe(_)));
    }

    #[tokio::test]
    async fn test_unreadable_source_is_probe_error() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(&video, b"not a real video").unwrap();

        let pipeline = ClippingPipeline::new(options(&dir.path().join("clips")));
        let (_tx, rx) = watch::channel(false);

        let specs = vec![ClipSpec::new("A", 0.0, 10.0)];
        let result = pipeline.run(&video, &specs, |_| {}, Some(rx)).await;

        assert!(matches!(result, Err(PipelineError::Probe(_))));
    }
}
