//! Adapter for the external face/speaker detection program.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::FaceAnalyzer;
use crate::error::{MediaError, MediaResult};
use reframe_models::FaceAnalysis;

/// How to invoke the external analyzer program.
///
/// The program receives the frame paths after `--frames` and, in speaker
/// mode, an `--active-speaker` flag. It prints a single JSON payload on
/// stdout and free-form diagnostics on stderr.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerCommand {
    /// Executable to run (e.g. "python3")
    pub program: String,
    /// Leading arguments (e.g. the analyzer script path)
    #[serde(default)]
    pub args: Vec<String>,
}

impl AnalyzerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Primary analyzer backend: a black-box subprocess.
///
/// This adapter only invokes and parses; it never reimplements detection.
pub struct ExternalFaceAnalyzer {
    command: AnalyzerCommand,
}

impl ExternalFaceAnalyzer {
    pub fn new(command: AnalyzerCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl FaceAnalyzer for ExternalFaceAnalyzer {
    async fn analyze(
        &self,
        frame_paths: &[PathBuf],
        active_speaker: bool,
    ) -> MediaResult<FaceAnalysis> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        cmd.arg("--frames");
        cmd.args(frame_paths);
        if active_speaker {
            cmd.arg("--active-speaker");
        }

        debug!(
            program = %self.command.program,
            frames = frame_paths.len(),
            active_speaker,
            "Invoking external face analyzer"
        );

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                MediaError::analyzer_failed(
                    format!("failed to spawn {}: {}", self.command.program, e),
                    None,
                )
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            warn!(
                exit_code = ?output.status.code(),
                "External analyzer exited non-zero"
            );
            return Err(MediaError::analyzer_failed(
                format!(
                    "analyzer exited with status {}",
                    output.status.code().unwrap_or(-1)
                ),
                Some(stderr),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let analysis = parse_analyzer_output(&stdout)
            .ok_or_else(|| MediaError::analyzer_failed("unparseable analyzer output", Some(stderr)))?;

        debug!(
            ok = analysis.ok,
            multi_face = analysis.multi_face,
            center_x = ?analysis.center_x,
            speaker_center_x = ?analysis.speaker_center_x,
            "Analyzer result"
        );

        Ok(analysis)
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

/// Parse the analyzer's stdout into a [`FaceAnalysis`].
///
/// The payload is the last non-empty line; anything before it is tolerated
/// so the analyzer may print banners on stdout without breaking us.
fn parse_analyzer_output(stdout: &str) -> Option<FaceAnalysis> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line() {
        let analysis =
            parse_analyzer_output(r#"{"ok": true, "center_x": 640.0, "multi_face": false}"#)
                .unwrap();
        assert!(analysis.ok);
        assert_eq!(analysis.center_x, Some(640.0));
    }

    #[test]
    fn test_parse_takes_last_line() {
        let stdout = "loading model\n{\"ok\": true, \"center_x\": 100.0}\n";
        let analysis = parse_analyzer_output(stdout).unwrap();
        assert_eq!(analysis.center_x, Some(100.0));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_analyzer_output("not json at all").is_none());
        assert!(parse_analyzer_output("").is_none());
    }

    #[test]
    fn test_parse_speaker_fields() {
        let stdout = r#"{"ok": true, "multi_face": true, "center_x": 800.0,
            "speaker_center_x": 1200.0, "speaker_frame_ratio": 0.8,
            "speaker_motion_ratio": 0.7, "frame_centers": [1190.0, 1210.0]}"#
            .replace('\n', " ");
        let analysis = parse_analyzer_output(&stdout).unwrap();
        assert_eq!(analysis.speaker_center_x, Some(1200.0));
        assert!(analysis.speaker_gate_passes(0.6, 0.55));
        assert_eq!(analysis.frame_centers.len(), 2);
    }
}
