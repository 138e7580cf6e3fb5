//! Clip requests and per-clip results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A requested output clip, produced by the upstream selection pipeline.
///
/// Specs are not validated against each other: overlapping and out-of-order
/// requests are processed independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    /// Human-readable clip title (may collide across specs)
    pub title: String,
    /// Clip start in source-video seconds
    pub start_secs: f64,
    /// Clip end in source-video seconds, must exceed start
    pub end_secs: f64,
}

impl ClipSpec {
    pub fn new(title: impl Into<String>, start_secs: f64, end_secs: f64) -> Self {
        Self {
            title: title.into(),
            start_secs,
            end_secs,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Stable identity derived from the time bounds (millisecond precision).
    ///
    /// Titles can collide; the key lets callers reconcile results against
    /// the original request list even when they do.
    pub fn clip_key(&self) -> String {
        format!(
            "{}-{}",
            (self.start_secs * 1000.0).round() as i64,
            (self.end_secs * 1000.0).round() as i64
        )
    }

    /// Output filename for this clip.
    ///
    /// Format: `clip_{index:02}_{safe_title}.mp4`
    pub fn output_filename(&self, index: usize) -> String {
        let safe_title = sanitize_filename_title(&self.title);
        if safe_title.is_empty() {
            format!("clip_{:02}.mp4", index + 1)
        } else {
            format!("clip_{:02}_{}.mp4", index + 1, safe_title)
        }
    }
}

/// Outcome of one clip extraction attempt. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipResult {
    /// Zero-based position in the request list
    pub index: usize,
    /// Title copied from the request
    pub title: String,
    /// Requested start in seconds
    pub start_secs: f64,
    /// Requested end in seconds
    pub end_secs: f64,
    /// Identity derived from the time bounds
    pub clip_key: String,
    /// Path of the written clip, when extraction succeeded
    pub clip_path: Option<PathBuf>,
    /// Whether extraction (including the retry) succeeded
    pub success: bool,
    /// Captured error when it did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClipResult {
    /// A successful extraction.
    pub fn ok(index: usize, spec: &ClipSpec, clip_path: PathBuf) -> Self {
        Self {
            index,
            title: spec.title.clone(),
            start_secs: spec.start_secs,
            end_secs: spec.end_secs,
            clip_key: spec.clip_key(),
            clip_path: Some(clip_path),
            success: true,
            error: None,
        }
    }

    /// A failed extraction with the captured error.
    pub fn failed(index: usize, spec: &ClipSpec, error: impl Into<String>) -> Self {
        Self {
            index,
            title: spec.title.clone(),
            start_secs: spec.start_secs,
            end_secs: spec.end_secs,
            clip_key: spec.clip_key(),
            clip_path: None,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Sanitize a title for use in filenames.
///
/// Only ASCII alphanumerics, hyphen, underscore, and space survive; spaces
/// collapse to underscores and the result is lowercased and length-capped.
pub fn sanitize_filename_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-' || *c == '_')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
        .chars()
        .take(50)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_key_millisecond_precision() {
        let spec = ClipSpec::new("A", 10.0, 25.5);
        assert_eq!(spec.clip_key(), "10000-25500");
    }

    #[test]
    fn test_clip_key_distinguishes_colliding_titles() {
        let a = ClipSpec::new("Highlight", 10.0, 25.0);
        let b = ClipSpec::new("Highlight", 30.0, 45.0);
        assert_ne!(a.clip_key(), b.clip_key());
    }

    #[test]
    fn test_output_filename() {
        let spec = ClipSpec::new("My Amazing Scene!", 0.0, 10.0);
        assert_eq!(spec.output_filename(0), "clip_01_my_amazing_scene.mp4");
    }

    #[test]
    fn test_output_filename_empty_title() {
        let spec = ClipSpec::new("!!!", 0.0, 10.0);
        assert_eq!(spec.output_filename(2), "clip_03.mp4");
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_filename_title("Hello World!"), "hello_world");
        assert_eq!(sanitize_filename_title("Test@#$%123"), "test123");
    }

    #[test]
    fn test_result_carries_key() {
        let spec = ClipSpec::new("A", 10.0, 25.0);
        let result = ClipResult::failed(0, &spec, "encode failed");
        assert_eq!(result.clip_key, spec.clip_key());
        assert!(!result.success);
        assert!(result.clip_path.is_none());
    }
}
