//! Batch clipping run driver.
//!
//! Given a source video and an ordered list of clip requests, this crate
//! plans the crop for each clip and drives the extractions sequentially,
//! emitting progress events and isolating per-clip failures.

pub mod config;
pub mod error;
pub mod run;

pub use config::RunOptions;
pub use error::{PipelineError, PipelineResult};
pub use run::ClippingPipeline;
