#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper, crop planning, and clip extraction.
//!
//! This crate provides:
//! - Type-safe FFmpeg/ffprobe command building with cancellation support
//! - Video geometry probing
//! - Still-frame sampling into scoped temporary directories
//! - Face/speaker analyzer adapters with a layered fallback chain
//! - Static (whole-video) and dynamic (per-clip) crop planning
//! - Trim/crop/concat filter graph compilation
//! - Clip extraction with stream-copy-first, re-encode-on-failure retry

pub mod analyzer;
pub mod command;
pub mod error;
pub mod extract;
pub mod frames;
pub mod graph;
pub mod planner;
pub mod probe;
pub mod thumbnail;

pub use analyzer::{AnalyzerCommand, ExternalFaceAnalyzer, FaceAnalyzer, FallbackFaceDetector};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use extract::{verify_output, ClipExtractor, ExtractionMode, MIN_OUTPUT_BYTES};
pub use frames::{distributed_timestamps, sample_at, sample_distributed, SampledFrames};
pub use graph::{build_segment_graph, static_crop_filter, FilterGraph};
pub use planner::{DynamicCropPlanner, PlannerConfig, StaticCropPlanner};
pub use probe::probe_video;
pub use thumbnail::generate_thumbnail;
