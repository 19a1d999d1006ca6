pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::{Pipeline, PipelineError, PipelineOptions, RunReport, RunState};
