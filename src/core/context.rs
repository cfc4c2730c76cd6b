//! Per-run execution context

use crate::core::result::StepResult;
use crate::core::step::Step;
use crate::core::Pipeline;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.-]*)\}").expect("valid regex"));

/// Mutable state for a single pipeline run.
///
/// The pipeline definition itself is never touched; everything a run
/// accumulates lives here and is discarded when the run ends. The runner is
/// the only writer, one step at a time.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Working directory for agent processes
    pub project_root: PathBuf,

    /// Pipeline defaults merged with caller overrides
    pub variables: HashMap<String, String>,

    /// Run environment; lookups fall back to the process environment
    pub env: HashMap<String, String>,

    /// Fail interpolation on unresolved placeholders instead of blanking them
    pub strict_vars: bool,

    results: HashMap<String, StepResult>,
    executed: Vec<String>,
}

impl RunContext {
    /// Build a context for one run of the given pipeline
    pub fn for_run(
        pipeline: &Pipeline,
        overrides: HashMap<String, String>,
        project_root: PathBuf,
    ) -> Self {
        let mut variables = pipeline.variables.clone();
        variables.extend(overrides);

        Self {
            project_root,
            variables,
            env: pipeline.env.clone(),
            strict_vars: false,
            results: HashMap::new(),
            executed: Vec::new(),
        }
    }

    /// Record a completed step result
    pub fn record(&mut self, result: StepResult) {
        self.executed.push(result.step_id.clone());
        self.results.insert(result.step_id.clone(), result);
    }

    /// Result of a specific step, if it has been reached
    pub fn result(&self, step_id: &str) -> Option<&StepResult> {
        self.results.get(step_id)
    }

    /// Result of the most recently executed step
    pub fn last_executed(&self) -> Option<&StepResult> {
        self.executed.last().and_then(|id| self.results.get(id))
    }

    /// Environment lookup: run env first, then the process environment
    pub fn env_value(&self, name: &str) -> Option<String> {
        self.env
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Replace `${VAR}` placeholders from variables, then environment.
    ///
    /// Unresolved placeholders become the empty string by default; in strict
    /// mode the first unresolved name is returned as an error instead.
    pub fn interpolate(&self, text: &str) -> Result<String, String> {
        let mut missing = None;
        let rendered = PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            if let Some(value) = self.variables.get(name) {
                value.clone()
            } else if let Some(value) = self.env_value(name) {
                value
            } else {
                if missing.is_none() {
                    missing = Some(name.to_string());
                }
                String::new()
            }
        });

        match missing {
            Some(name) if self.strict_vars => Err(name),
            _ => Ok(rendered.into_owned()),
        }
    }

    /// Assemble the "previous output" handed to a step's agent.
    ///
    /// With explicit dependencies, each dependency's output is labeled by
    /// step id in declared order. Without them, the most recent non-skipped
    /// step's output is chained through.
    pub fn dependency_context(&self, step: &Step) -> Option<String> {
        if !step.depends_on.is_empty() {
            let sections: Vec<String> = step
                .depends_on
                .iter()
                .filter_map(|dep| self.results.get(dep))
                .map(|result| format!("[{}]:\n{}", result.step_id, result.output))
                .collect();
            if sections.is_empty() {
                return None;
            }
            return Some(sections.join("\n\n"));
        }

        self.executed
            .iter()
            .rev()
            .filter_map(|id| self.results.get(id))
            .find(|result| !result.skipped)
            .map(|result| result.output.clone())
    }
}
