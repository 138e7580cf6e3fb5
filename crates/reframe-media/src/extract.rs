//! Clip extraction with a stream-copy-first, re-encode-on-failure policy.

use std::path::Path;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::graph::{build_segment_graph, single_segment_filter, static_crop_filter};
use reframe_models::{DynamicCropPlan, EncodingConfig, StaticCropPlan};

/// Minimum plausible output size. Guards against a silent zero-content
/// encode the external tool reported as successful.
pub const MIN_OUTPUT_BYTES: u64 = 1000;

/// How a single clip should be extracted.
#[derive(Debug, Clone, Copy)]
pub enum ExtractionMode<'a> {
    /// No crop: trim only, stream copy on the first attempt
    CopyOnly,
    /// One fixed crop window; requires a re-encode (compressed streams
    /// cannot be spatially cropped by copy)
    StaticCrop(&'a StaticCropPlan),
    /// Time-varying crop windows compiled into a filter graph
    DynamicCrop {
        plan: &'a DynamicCropPlan,
        frame_width: u32,
    },
}

/// Drives the external encoder for one clip at a time.
pub struct ClipExtractor {
    encoding: EncodingConfig,
    min_output_bytes: u64,
    timeout_secs: Option<u64>,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl ClipExtractor {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            min_output_bytes: MIN_OUTPUT_BYTES,
            timeout_secs: None,
            cancel_rx: None,
        }
    }

    /// Set cancellation signal, forwarded to every encoder invocation.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set a per-invocation timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Override the minimum output size check.
    pub fn with_min_output_bytes(mut self, bytes: u64) -> Self {
        self.min_output_bytes = bytes;
        self
    }

    /// Extract `[start_secs, end_secs]` of `input` into `output`.
    ///
    /// On any failure (the encoder erroring, or the output failing the size
    /// check) retries exactly once with a forced full re-encode, even for
    /// modes first attempted as stream copy. Cancellation is not retried.
    pub async fn extract(
        &self,
        input: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
        mode: ExtractionMode<'_>,
    ) -> MediaResult<()> {
        match self.attempt(input, output, start_secs, end_secs, &mode, false).await {
            Ok(()) => Ok(()),
            Err(MediaError::Cancelled) => Err(MediaError::Cancelled),
            Err(first) => {
                warn!(
                    output = %output.display(),
                    "Extraction failed ({}), retrying with forced re-encode",
                    first
                );
                self.attempt(input, output, start_secs, end_secs, &mode, true)
                    .await
            }
        }
    }

    async fn attempt(
        &self,
        input: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
        mode: &ExtractionMode<'_>,
        force_reencode: bool,
    ) -> MediaResult<()> {
        let cmd = self.build_command(input, output, start_secs, end_secs, mode, force_reencode);

        let mut runner = FfmpegRunner::new();
        if let Some(rx) = &self.cancel_rx {
            runner = runner.with_cancel(rx.clone());
        }
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }

        runner.run(&cmd).await?;
        verify_output(output, self.min_output_bytes)?;

        debug!(output = %output.display(), "Clip extracted");
        Ok(())
    }

    fn build_command(
        &self,
        input: &Path,
        output: &Path,
        start_secs: f64,
        end_secs: f64,
        mode: &ExtractionMode<'_>,
        force_reencode: bool,
    ) -> FfmpegCommand {
        let duration = end_secs - start_secs;

        match mode {
            ExtractionMode::CopyOnly => {
                let cmd = FfmpegCommand::new(input, output)
                    .seek(start_secs)
                    .duration(duration);
                if force_reencode {
                    cmd.output_args(self.encoding.to_ffmpeg_args())
                } else {
                    cmd.codec_copy()
                        .output_arg("-avoid_negative_ts")
                        .output_arg("make_zero")
                }
            }
            ExtractionMode::StaticCrop(plan) => FfmpegCommand::new(input, output)
                .seek(start_secs)
                .duration(duration)
                .video_filter(static_crop_filter(plan))
                .output_args(self.encoding.to_ffmpeg_args()),
            ExtractionMode::DynamicCrop { plan, frame_width } => {
                if plan.is_static() {
                    // One segment: a plain crop over the trimmed clip is an
                    // equivalent, cheaper encoding
                    FfmpegCommand::new(input, output)
                        .seek(start_secs)
                        .duration(duration)
                        .video_filter(single_segment_filter(plan, *frame_width))
                        .output_args(self.encoding.to_ffmpeg_args())
                } else {
                    // The graph trims on absolute source timestamps, so no
                    // input seek here
                    let graph = build_segment_graph(plan, *frame_width);
                    FfmpegCommand::new(input, output)
                        .filter_complex(graph.filter_complex)
                        .map(graph.video_label)
                        .map(graph.audio_label)
                        .output_args(self.encoding.to_ffmpeg_args())
                }
            }
        }
    }
}

/// Check that the encoder actually wrote a plausible file.
pub fn verify_output(path: &Path, min_bytes: u64) -> MediaResult<u64> {
    let metadata =
        std::fs::metadata(path).map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;
    let size = metadata.len();
    if size < min_bytes {
        return Err(MediaError::OutputTooSmall {
            path: path.to_path_buf(),
            size,
        });
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_models::CropSegment;

    fn extractor() -> ClipExtractor {
        ClipExtractor::new(EncodingConfig::default())
    }

    fn static_plan() -> StaticCropPlan {
        StaticCropPlan {
            crop_width: 676,
            crop_height: 1080,
            crop_x: 622,
            needs_crop: true,
            used_analyzer: true,
            multi_face_detected: false,
            active_speaker_mode: false,
        }
    }

    fn args_for(mode: ExtractionMode<'_>, force: bool) -> Vec<String> {
        extractor()
            .build_command(
                Path::new("in.mp4"),
                Path::new("out.mp4"),
                10.0,
                25.0,
                &mode,
                force,
            )
            .build_args()
    }

    #[test]
    fn test_copy_mode_first_attempt_is_stream_copy() {
        let args = args_for(ExtractionMode::CopyOnly, false);
        let c = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[c + 1], "copy");
        assert!(!args.contains(&"-c:v".to_string()));
    }

    #[test]
    fn test_copy_mode_retry_is_full_reencode() {
        let args = args_for(ExtractionMode::CopyOnly, true);
        assert!(args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert!(!args.contains(&"copy".to_string()));
    }

    #[test]
    fn test_static_crop_always_reencodes() {
        for force in [false, true] {
            let plan = static_plan();
            let args = args_for(ExtractionMode::StaticCrop(&plan), force);
            let vf = args.iter().position(|a| a == "-vf").unwrap();
            assert_eq!(args[vf + 1], "crop=676:1080:622:0");
            assert!(args.contains(&"-c:v".to_string()));
        }
    }

    #[test]
    fn test_dynamic_multi_segment_uses_filter_graph_without_seek() {
        let plan = DynamicCropPlan {
            crop_width: 676,
            crop_height: 1080,
            segments: vec![
                CropSegment::new(10.0, 18.0, 400.0),
                CropSegment::new(18.0, 25.0, 1400.0),
            ],
        };
        let args = args_for(
            ExtractionMode::DynamicCrop {
                plan: &plan,
                frame_width: 1920,
            },
            false,
        );
        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(args.contains(&"[vout]".to_string()));
        assert!(args.contains(&"[aout]".to_string()));
        // Trim filters carry the timing; an input seek would shift them
        assert!(!args.contains(&"-ss".to_string()));
    }

    #[test]
    fn test_dynamic_single_segment_collapses_to_static_style() {
        let plan = DynamicCropPlan {
            crop_width: 676,
            crop_height: 1080,
            segments: vec![CropSegment::new(10.0, 25.0, 960.0)],
        };
        let args = args_for(
            ExtractionMode::DynamicCrop {
                plan: &plan,
                frame_width: 1920,
            },
            false,
        );
        assert!(!args.contains(&"-filter_complex".to_string()));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "crop=676:1080:622:0");
        assert!(args.contains(&"-ss".to_string()));
    }

    #[test]
    fn test_verify_output_accepts_plausible_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 2000]).unwrap();
        assert_eq!(verify_output(&path, MIN_OUTPUT_BYTES).unwrap(), 2000);
    }

    #[test]
    fn test_verify_output_rejects_undersized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 400]).unwrap();
        let err = verify_output(&path, MIN_OUTPUT_BYTES).unwrap_err();
        assert!(matches!(err, MediaError::OutputTooSmall { size: 400, .. }));
    }

    #[test]
    fn test_verify_output_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never_written.mp4");
        let err = verify_output(&path, MIN_OUTPUT_BYTES).unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
