//! Agent invocation and outcome types

use crate::core::Artifacts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for agent execution
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("execution cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Everything an agent needs to run one step
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    pub step_id: String,

    /// Fully interpolated task text
    pub task: String,

    /// Fully interpolated file list
    pub files: Vec<String>,

    /// Labeled output of upstream steps, if any
    pub previous_output: Option<String>,

    /// Environment entries for the agent process
    pub env: HashMap<String, String>,

    /// Working directory for the agent process
    pub working_dir: PathBuf,
}

impl AgentInvocation {
    /// Render the full prompt handed to the agent process
    pub fn prompt(&self) -> String {
        let mut prompt = self.task.clone();

        if !self.files.is_empty() {
            prompt.push_str("\n\nFiles:\n");
            for file in &self.files {
                prompt.push_str("- ");
                prompt.push_str(file);
                prompt.push('\n');
            }
        }

        if let Some(previous) = &self.previous_output {
            prompt.push_str("\n\nContext from previous steps:\n");
            prompt.push_str(previous);
        }

        prompt
    }
}

/// Successful result of one agent invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub output: String,
    pub artifacts: Artifacts,
    pub duration_ms: u64,
    pub tool_used: String,
}
