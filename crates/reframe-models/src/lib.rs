//! Shared data models for the reframe clipping pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video geometry probed from the source file
//! - Face/speaker analysis results from the external analyzer
//! - Static and dynamic crop plans
//! - Clip requests, results, and progress events
//! - Encoding configuration

pub mod analysis;
pub mod clip;
pub mod crop;
pub mod encoding;
pub mod progress;
pub mod video;

// Re-export common types
pub use analysis::FaceAnalysis;
pub use clip::{sanitize_filename_title, ClipResult, ClipSpec};
pub use crop::{
    clamp_crop_x, largest_even, round_even, CropMode, CropSegment, DynamicCropPlan,
    StaticCropPlan,
};
pub use encoding::EncodingConfig;
pub use progress::{ClipProgress, ClippingRun};
pub use video::VideoDimensions;
