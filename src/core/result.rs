//! Run result models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Files and code blocks produced by one or more steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    /// File paths touched or reported by agents
    pub files: Vec<String>,

    /// Code blocks emitted in agent output
    pub code: Vec<String>,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.code.is_empty()
    }

    /// Append another artifact set, preserving discovery order
    pub fn extend(&mut self, other: &Artifacts) {
        self.files.extend(other.files.iter().cloned());
        self.code.extend(other.code.iter().cloned());
    }
}

/// Outcome of a single step. Produced for every step the runner reaches,
/// whether it ran, failed, or was skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub success: bool,
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    /// Name of the agent that ran the step; empty when routing failed
    pub agent_used: String,

    #[serde(default, skip_serializing_if = "Artifacts::is_empty")]
    pub artifacts: Artifacts,

    #[serde(default)]
    pub skipped: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl StepResult {
    pub fn succeeded(
        step_id: impl Into<String>,
        agent: impl Into<String>,
        output: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            success: true,
            output: output.into(),
            error: None,
            duration_ms,
            agent_used: agent.into(),
            artifacts: Artifacts::default(),
            skipped: false,
            skip_reason: None,
        }
    }

    pub fn failed(
        step_id: impl Into<String>,
        agent: impl Into<String>,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            success: false,
            output: String::new(),
            error: Some(error.into()),
            duration_ms,
            agent_used: agent.into(),
            artifacts: Artifacts::default(),
            skipped: false,
            skip_reason: None,
        }
    }

    /// A skipped step counts as satisfied for downstream dependencies
    pub fn skipped(step_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            success: true,
            output: String::new(),
            error: None,
            duration_ms: 0,
            agent_used: String::new(),
            artifacts: Artifacts::default(),
            skipped: true,
            skip_reason: Some(reason.into()),
        }
    }

    pub fn with_artifacts(mut self, artifacts: Artifacts) -> Self {
        self.artifacts = artifacts;
        self
    }
}

/// Consumer-facing result of a whole pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub pipeline_name: String,
    pub run_id: Uuid,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub total_duration_ms: u64,

    /// Step results in execution order; partial on early halt
    pub step_results: Vec<StepResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Artifacts::is_empty")]
    pub artifacts: Artifacts,
}

impl PipelineResult {
    /// Look up the result of a specific step
    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.step_results.iter().find(|r| r.step_id == step_id)
    }

    /// Step ids in the order they were reached
    pub fn executed_order(&self) -> Vec<&str> {
        self.step_results.iter().map(|r| r.step_id.as_str()).collect()
    }
}
