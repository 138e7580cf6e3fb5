//! FFprobe video geometry.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};
use reframe_models::VideoDimensions;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a video file for its geometry and duration.
///
/// Fails if ffprobe cannot run, its output cannot be parsed, or the file has
/// no video stream with a usable width and height. A missing or unparseable
/// duration is not an error; it comes back as `None`.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoDimensions> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            format!("ffprobe failed for {}", path.display()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    parse_dimensions(&probe)
}

fn parse_dimensions(probe: &FfprobeOutput) -> MediaResult<VideoDimensions> {
    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let width = video_stream.width.filter(|w| *w > 0).ok_or_else(|| {
        MediaError::InvalidVideo("Video stream has no usable width".to_string())
    })?;
    let height = video_stream.height.filter(|h| *h > 0).ok_or_else(|| {
        MediaError::InvalidVideo("Video stream has no usable height".to_string())
    })?;

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| *d > 0.0);

    debug!(
        width,
        height,
        duration = ?duration_secs,
        "Probed video geometry"
    );

    Ok(VideoDimensions::new(width, height, duration_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_from_json(json: &str) -> MediaResult<VideoDimensions> {
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        parse_dimensions(&probe)
    }

    #[test]
    fn test_parse_full_output() {
        let dims = probe_from_json(
            r#"{
                "format": {"duration": "60.021"},
                "streams": [
                    {"codec_type": "audio"},
                    {"codec_type": "video", "width": 1920, "height": 1080}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(dims.width, 1920);
        assert_eq!(dims.height, 1080);
        assert!((dims.duration_secs.unwrap() - 60.021).abs() < 1e-9);
    }

    #[test]
    fn test_missing_duration_is_unknown() {
        let dims = probe_from_json(
            r#"{
                "format": {},
                "streams": [{"codec_type": "video", "width": 1280, "height": 720}]
            }"#,
        )
        .unwrap();
        assert_eq!(dims.duration_secs, None);
    }

    #[test]
    fn test_no_video_stream_is_error() {
        let err = probe_from_json(r#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#)
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
    }

    #[test]
    fn test_zero_width_is_error() {
        let err = probe_from_json(
            r#"{"format": {}, "streams": [{"codec_type": "video", "width": 0, "height": 720}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
    }
}
