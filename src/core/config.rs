//! Pipeline configuration from YAML

use crate::core::condition::Condition;
use crate::core::error::DefinitionError;
use crate::core::Pipeline;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: Option<String>,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Pipeline version (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Default variables available to all steps
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, String>,

    /// Environment entries for the run
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Pipeline steps
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Default timeout for steps in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepConfig {
    /// Unique step identifier (auto-assigned `step-N` when absent)
    #[serde(default)]
    pub id: Option<String>,

    /// Human-readable step name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,

    /// Optional step description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Explicit agent name; wins over task-type routing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    /// Task type for capability-based routing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,

    /// The task text, a template with `${VAR}` placeholders
    #[serde(default)]
    pub task: Option<String>,

    /// Files the step operates on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// List of step IDs this step depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Condition expression gating execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Retry policy for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Timeout for this step in milliseconds (overrides the pipeline default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Human-approval gate before the step runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateConfig>,

    /// Step to execute once as recovery when this step fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,

    /// Informational output labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay between attempts in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_max_attempts() -> usize {
    1
}

/// Approval gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    #[serde(default = "default_gate_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_gate_enabled() -> bool {
    true
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, DefinitionError> {
        let mut config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Assign missing step ids (`step-1`, `step-2`, ...) and default names
    fn normalize(&mut self) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            if step.id.as_deref().map(str::trim).unwrap_or("").is_empty() {
                step.id = Some(format!("step-{}", index + 1));
            }
            if step.name.as_deref().map(str::trim).unwrap_or("").is_empty() {
                step.name = step.id.clone();
            }
        }
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let name = match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => return Err(DefinitionError::MissingName),
        };

        if self.steps.is_empty() {
            return Err(DefinitionError::NoSteps(name.to_string()));
        }

        // Step ids must be unique
        let mut seen_ids = HashSet::new();
        for step in &self.steps {
            let id = step.id.as_deref().unwrap_or("");
            if !seen_ids.insert(id) {
                return Err(DefinitionError::DuplicateStepId(id.to_string()));
            }
        }

        let step_ids: HashSet<&str> = self
            .steps
            .iter()
            .filter_map(|s| s.id.as_deref())
            .collect();

        for step in &self.steps {
            let id = step.id.as_deref().unwrap_or("");

            if step.task.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(DefinitionError::EmptyTask(id.to_string()));
            }

            // Every referenced dependency must exist
            for dep in &step.depends_on {
                if !step_ids.contains(dep.as_str()) {
                    return Err(DefinitionError::UnknownDependency {
                        step: id.to_string(),
                        dependency: dep.clone(),
                    });
                }
            }

            if let Some(target) = &step.on_failure {
                if !step_ids.contains(target.as_str()) {
                    return Err(DefinitionError::UnknownFailureHandler {
                        step: id.to_string(),
                        target: target.clone(),
                    });
                }
            }

            if let Some(condition) = &step.condition {
                if Condition::parse(condition).is_none() {
                    return Err(DefinitionError::InvalidCondition {
                        step: id.to_string(),
                        condition: condition.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Convert config to a Pipeline domain model.
    ///
    /// Also runs cycle detection, so a config that passes here is fully
    /// orderable.
    pub fn to_pipeline(&self) -> Result<Pipeline, DefinitionError> {
        Pipeline::from_config(self)
    }
}
