//! Secondary in-process face detector (last-resort fallback tier).
//!
//! Wraps OpenCV's FaceDetectorYN over the already-sampled frame images. The
//! model handle is initialized once per process and shared for the process
//! lifetime; creating it involves a model file search and a DNN load, which
//! is too expensive to repeat per analysis call.
//!
//! Without the `opencv` feature the detector reports itself unavailable and
//! the planner's fallback chain degrades to geometric centering.

use async_trait::async_trait;
use std::path::PathBuf;

use super::FaceAnalyzer;
use crate::error::{MediaError, MediaResult};
use reframe_models::FaceAnalysis;

/// Secondary face detector used when the primary analyzer produced no
/// usable center.
pub struct FallbackFaceDetector;

impl FallbackFaceDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FallbackFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceAnalyzer for FallbackFaceDetector {
    async fn analyze(
        &self,
        frame_paths: &[PathBuf],
        _active_speaker: bool,
    ) -> MediaResult<FaceAnalysis> {
        // Detection runs on image files and is CPU-bound; keep it off the
        // async executor threads.
        let paths = frame_paths.to_vec();
        tokio::task::spawn_blocking(move || imp::detect_in_frames(&paths))
            .await
            .map_err(|e| MediaError::DetectionUnavailable(format!("detector task failed: {e}")))?
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(feature = "opencv")]
mod imp {
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, OnceLock};
    use tracing::{debug, warn};

    use crate::error::{MediaError, MediaResult};
    use reframe_models::FaceAnalysis;

    use opencv::core::{Mat, Size};
    use opencv::objdetect::FaceDetectorYN;
    use opencv::prelude::{FaceDetectorYNTrait, MatTraitConst};

    /// Detector input size. Frames are resized to this before inference.
    const INPUT_WIDTH: i32 = 640;
    const INPUT_HEIGHT: i32 = 360;

    const SCORE_THRESHOLD: f32 = 0.5;
    const NMS_THRESHOLD: f32 = 0.3;
    const TOP_K: i32 = 10;

    /// Candidate model locations, in preference order. `REFRAME_YUNET_MODEL`
    /// overrides them all.
    const MODEL_PATHS: &[&str] = &[
        "./models/face_detection_yunet_2023mar.onnx",
        "./models/face_detection_yunet_2022mar.onnx",
        "/usr/share/opencv/models/face_detection_yunet_2023mar.onnx",
        "/usr/share/opencv/models/face_detection_yunet_2022mar.onnx",
    ];

    /// Process-wide detector handle, created on first use.
    static DETECTOR: OnceLock<Option<Mutex<opencv::core::Ptr<FaceDetectorYN>>>> = OnceLock::new();

    fn find_model_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("REFRAME_YUNET_MODEL") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }
        MODEL_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    fn detector() -> Option<&'static Mutex<opencv::core::Ptr<FaceDetectorYN>>> {
        DETECTOR
            .get_or_init(|| {
                let model_path = match find_model_path() {
                    Some(p) => p,
                    None => {
                        warn!("Fallback face model not found, tier disabled");
                        return None;
                    }
                };

                match FaceDetectorYN::create(
                    &model_path.to_string_lossy(),
                    "",
                    Size::new(INPUT_WIDTH, INPUT_HEIGHT),
                    SCORE_THRESHOLD,
                    NMS_THRESHOLD,
                    TOP_K,
                    0,
                    0,
                ) {
                    Ok(det) => {
                        debug!(model = %model_path.display(), "Fallback face detector loaded");
                        Some(Mutex::new(det))
                    }
                    Err(e) => {
                        warn!("Failed to load fallback face model: {}", e);
                        None
                    }
                }
            })
            .as_ref()
    }

    pub(super) fn detect_in_frames(frame_paths: &[PathBuf]) -> MediaResult<FaceAnalysis> {
        let detector = detector().ok_or_else(|| {
            MediaError::DetectionUnavailable("no face model available".to_string())
        })?;
        let mut detector = detector
            .lock()
            .map_err(|_| MediaError::DetectionUnavailable("detector poisoned".to_string()))?;

        let mut frame_centers = Vec::with_capacity(frame_paths.len());
        let mut centers = Vec::new();
        let mut multi_face = false;

        for path in frame_paths {
            match detect_in_image(&mut detector, path) {
                Ok((face_count, center)) => {
                    if face_count >= 2 {
                        multi_face = true;
                    }
                    if let Some(cx) = center {
                        centers.push(cx);
                    }
                    frame_centers.push(center);
                }
                Err(e) => {
                    warn!(frame = %path.display(), "Fallback detection failed: {}", e);
                    frame_centers.push(None);
                }
            }
        }

        let center_x = if centers.is_empty() {
            None
        } else {
            Some(centers.iter().sum::<f64>() / centers.len() as f64)
        };

        Ok(FaceAnalysis {
            ok: true,
            center_x,
            multi_face,
            frame_centers,
            ..Default::default()
        })
    }

    /// Detect faces in one image; returns the face count and the largest
    /// face's horizontal center in source-image pixels.
    fn detect_in_image(
        detector: &mut opencv::core::Ptr<FaceDetectorYN>,
        path: &Path,
    ) -> MediaResult<(usize, Option<f64>)> {
        use opencv::imgcodecs;
        use opencv::imgproc;

        let image = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_COLOR)
            .map_err(|e| MediaError::DetectionUnavailable(format!("imread: {e}")))?;
        if image.empty() {
            return Ok((0, None));
        }

        let src_width = image.cols() as f64;

        let mut resized = Mat::default();
        imgproc::resize(
            &image,
            &mut resized,
            Size::new(INPUT_WIDTH, INPUT_HEIGHT),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(|e| MediaError::DetectionUnavailable(format!("resize: {e}")))?;

        detector
            .set_input_size(Size::new(INPUT_WIDTH, INPUT_HEIGHT))
            .map_err(|e| MediaError::DetectionUnavailable(format!("set_input_size: {e}")))?;

        let mut faces = Mat::default();
        detector
            .detect(&resized, &mut faces)
            .map_err(|e| MediaError::DetectionUnavailable(format!("detect: {e}")))?;

        // Each row is [x, y, w, h, landmarks..., score] in input coordinates
        let face_count = faces.rows().max(0) as usize;
        let mut best: Option<(f64, f64)> = None; // (area, center_x)
        for row in 0..faces.rows() {
            let x = *faces.at_2d::<f32>(row, 0).unwrap_or(&0.0) as f64;
            let w = *faces.at_2d::<f32>(row, 2).unwrap_or(&0.0) as f64;
            let h = *faces.at_2d::<f32>(row, 3).unwrap_or(&0.0) as f64;
            let area = w * h;
            let center = (x + w / 2.0) / INPUT_WIDTH as f64 * src_width;
            if best.map_or(true, |(best_area, _)| area > best_area) {
                best = Some((area, center));
            }
        }

        Ok((face_count, best.map(|(_, cx)| cx)))
    }
}

#[cfg(not(feature = "opencv"))]
mod imp {
    use std::path::PathBuf;

    use crate::error::{MediaError, MediaResult};
    use reframe_models::FaceAnalysis;

    pub(super) fn detect_in_frames(_frame_paths: &[PathBuf]) -> MediaResult<FaceAnalysis> {
        Err(MediaError::DetectionUnavailable(
            "built without the opencv feature".to_string(),
        ))
    }
}
