//! Core domain models for pipelines

pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod result;
pub mod step;

pub use condition::Condition;
pub use context::RunContext;
pub use error::DefinitionError;
pub use pipeline::Pipeline;
pub use result::{Artifacts, PipelineResult, StepResult};
pub use step::{Gate, RetryPolicy, Step};
