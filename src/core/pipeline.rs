//! Pipeline domain model

use crate::core::config::{GateConfig, PipelineConfig, RetryConfig, StepConfig};
use crate::core::error::DefinitionError;
use crate::core::step::{Step, DEFAULT_TIMEOUT_MS};
use std::collections::HashMap;

/// An immutable pipeline definition.
///
/// Parsed once and reused across runs; per-run state lives in `RunContext`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub tags: Vec<String>,

    /// Default variables available to all steps
    pub variables: HashMap<String, String>,

    /// Environment entries for the run
    pub env: HashMap<String, String>,

    /// Steps in declared order
    pub steps: Vec<Step>,
}

/// DFS colors for cycle detection
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self, DefinitionError> {
        let default_timeout_ms = config.default_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);

        let steps: Vec<Step> = config
            .steps
            .iter()
            .map(|step_config| Step::from_config(step_config, default_timeout_ms))
            .collect();

        let pipeline = Pipeline {
            name: config.name.clone().unwrap_or_default(),
            description: config.description.clone(),
            version: config.version.clone(),
            tags: config.tags.clone(),
            variables: config.variables.clone(),
            env: config.env.clone(),
            steps,
        };

        // Reject cyclic definitions up front
        pipeline.execution_order()?;

        Ok(pipeline)
    }

    /// Get a step by id
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Topological order over `dependsOn` edges.
    ///
    /// Three-color DFS in declared-step order, so independent steps keep
    /// their declared relative order. Re-entering a step that is still being
    /// visited is a cycle.
    pub fn execution_order(&self) -> Result<Vec<String>, DefinitionError> {
        let index: HashMap<&str, &Step> =
            self.steps.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut marks: HashMap<&str, Mark> = self
            .steps
            .iter()
            .map(|s| (s.id.as_str(), Mark::Unvisited))
            .collect();
        let mut order = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            if marks[step.id.as_str()] == Mark::Unvisited {
                Self::visit(step.id.as_str(), &index, &mut marks, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit<'a>(
        step_id: &'a str,
        index: &HashMap<&'a str, &'a Step>,
        marks: &mut HashMap<&'a str, Mark>,
        order: &mut Vec<String>,
    ) -> Result<(), DefinitionError> {
        marks.insert(step_id, Mark::Visiting);

        if let Some(step) = index.get(step_id) {
            for dep in &step.depends_on {
                match marks.get(dep.as_str()).copied() {
                    Some(Mark::Visiting) => {
                        return Err(DefinitionError::CyclicDependency(dep.clone()));
                    }
                    Some(Mark::Unvisited) => {
                        // dep is guaranteed present by validation
                        if let Some(dep_step) = index.get_key_value(dep.as_str()) {
                            Self::visit(dep_step.0, index, marks, order)?;
                        }
                    }
                    _ => {}
                }
            }
        }

        marks.insert(step_id, Mark::Visited);
        order.push(step_id.to_string());
        Ok(())
    }

    /// Reconstruct the serializable configuration form
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            name: Some(self.name.clone()),
            description: self.description.clone(),
            version: self.version.clone(),
            tags: self.tags.clone(),
            variables: self.variables.clone(),
            env: self.env.clone(),
            steps: self.steps.iter().map(step_to_config).collect(),
            default_timeout_ms: None,
        }
    }

    /// Serialize back to YAML; semantically round-trippable with `from_yaml`
    pub fn to_yaml(&self) -> Result<String, DefinitionError> {
        Ok(serde_yaml::to_string(&self.to_config())?)
    }
}

fn step_to_config(step: &Step) -> StepConfig {
    StepConfig {
        id: Some(step.id.clone()),
        name: Some(step.name.clone()),
        description: step.description.clone(),
        tool: step.tool.clone(),
        task_type: step.task_type.clone(),
        task: Some(step.task.clone()),
        files: step.files.clone(),
        depends_on: step.depends_on.clone(),
        condition: step.condition.as_ref().map(|c| c.to_string()),
        retry: (step.retry.max_attempts > 1 || step.retry.delay_ms > 0).then(|| RetryConfig {
            max_attempts: step.retry.max_attempts,
            delay_ms: step.retry.delay_ms,
        }),
        timeout_ms: Some(step.timeout_ms),
        gate: step.gate.as_ref().map(|g| GateConfig {
            enabled: true,
            message: g.message.clone(),
        }),
        on_failure: step.on_failure.clone(),
        outputs: step.outputs.clone(),
    }
}
