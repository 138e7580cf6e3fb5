//! Probed video geometry.

use serde::{Deserialize, Serialize};

/// Pixel geometry and duration of a source video, as reported by the probe.
///
/// One instance per source video, immutable once probed. Width and height are
/// always known (probing fails otherwise); duration may be absent for
/// streams the container cannot describe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoDimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in seconds, if the container reports one
    pub duration_secs: Option<f64>,
}

impl VideoDimensions {
    pub fn new(width: u32, height: u32, duration_secs: Option<f64>) -> Self {
        Self {
            width,
            height,
            duration_secs,
        }
    }

    /// Horizontal center of the frame.
    pub fn center_x(&self) -> f64 {
        self.width as f64 / 2.0
    }

    /// Whether the frame is wider than tall.
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}
