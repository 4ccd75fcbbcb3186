//! Batch analysis pipeline

pub mod orchestrator;

pub use orchestrator::{run, PipelineResult};
