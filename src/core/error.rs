//! Definition errors - fatal at parse/order time

use thiserror::Error;

/// Errors in a pipeline definition.
///
/// These are the only errors that abort before any step executes. Everything
/// that goes wrong during a run is captured into a `StepResult` instead.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("pipeline name is required")]
    MissingName,

    #[error("pipeline '{0}' has no steps")]
    NoSteps(String),

    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("step '{0}' has no task text")]
    EmptyTask(String),

    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("step '{step}' onFailure references unknown step '{target}'")]
    UnknownFailureHandler { step: String, target: String },

    #[error("step '{step}' has unsupported condition '{condition}'")]
    InvalidCondition { step: String, condition: String },

    #[error("cycle detected in dependency graph involving step '{0}'")]
    CyclicDependency(String),

    #[error("failed to read pipeline definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pipeline YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
