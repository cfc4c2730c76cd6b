//! taskpipe - a declarative task pipeline runner for AI coding agents

pub mod agent;
pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::agent::{AgentError, AgentOutcome, AgentRegistry, CliAgent, ExecutionAgent};
pub use crate::core::{DefinitionError, Pipeline, PipelineResult, RunContext, Step, StepResult};
pub use crate::execution::{CancelFlag, PipelineRunner, RunEvent, RunOptions};
