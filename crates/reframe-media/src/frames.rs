//! Still-frame sampling into a scoped temporary directory.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Frames extracted by one sampling call.
///
/// The frames live in a temporary directory owned by this value; dropping it
/// removes the directory and every frame in it, on success and failure paths
/// alike. Paths and timestamps are index-aligned.
#[derive(Debug)]
pub struct SampledFrames {
    dir: TempDir,
    paths: Vec<PathBuf>,
    timestamps: Vec<f64>,
}

impl SampledFrames {
    /// Frame image paths, in sampling order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Timestamps the frames were taken at, index-aligned with `paths`.
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Directory holding the frames, for diagnostics.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Choose `n` timestamps evenly spaced strictly inside `(0, duration)`.
///
/// The count is clamped to `[1, 12]` and spacing is `duration / (n + 1)`,
/// so the exact start and end are never sampled. Unknown duration yields a
/// single sample at `t = 0`.
pub fn distributed_timestamps(duration_secs: Option<f64>, count: usize) -> Vec<f64> {
    let duration = match duration_secs {
        Some(d) if d > 0.0 => d,
        _ => return vec![0.0],
    };

    let count = count.clamp(1, 12);
    let spacing = duration / (count as f64 + 1.0);
    (1..=count).map(|i| i as f64 * spacing).collect()
}

/// Sample `count` frames evenly distributed over the whole video.
pub async fn sample_distributed(
    video_path: impl AsRef<Path>,
    duration_secs: Option<f64>,
    count: usize,
) -> MediaResult<SampledFrames> {
    let timestamps = distributed_timestamps(duration_secs, count);
    sample_at(video_path, &timestamps).await
}

/// Sample exactly one frame per timestamp, preserving order.
///
/// Used for per-segment analysis where the timestamp-to-center
/// correspondence matters. Each extraction is a separate FFmpeg invocation;
/// any single failure fails the whole call.
pub async fn sample_at(
    video_path: impl AsRef<Path>,
    timestamps: &[f64],
) -> MediaResult<SampledFrames> {
    let video_path = video_path.as_ref();
    let dir = TempDir::with_prefix("reframe-frames-")?;

    let mut paths = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let frame_path = dir.path().join(format!("frame_{:03}.jpg", i));
        extract_frame(video_path, ts, &frame_path).await?;
        paths.push(frame_path);
    }

    debug!(
        frames = paths.len(),
        dir = %dir.path().display(),
        "Sampled frames"
    );

    Ok(SampledFrames {
        dir,
        paths,
        timestamps: timestamps.to_vec(),
    })
}

/// Extract a single frame at `timestamp` into `output`.
async fn extract_frame(video_path: &Path, timestamp: f64, output: &Path) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(video_path, output)
        .seek(timestamp.max(0.0))
        .single_frame()
        .output_arg("-q:v")
        .output_arg("2");

    FfmpegRunner::new().run(&cmd).await.map_err(|e| {
        MediaError::FrameExtraction {
            timestamp,
            message: e.to_string(),
        }
    })?;

    if !output.exists() {
        return Err(MediaError::FrameExtraction {
            timestamp,
            message: "no frame written".to_string(),
        });
    }

    Ok(())
}
