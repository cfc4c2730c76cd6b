//! CLI-wrapping execution agent
//!
//! Runs an external coding CLI as a subprocess, streaming stdout/stderr line
//! by line through the step callbacks. `kill_on_drop` guarantees the process
//! dies with the invocation future, which is how timeout and cancellation
//! terminate a running step.

use crate::agent::{
    AgentCapabilities, AgentError, AgentInvocation, AgentOutcome, ExecutionAgent,
    RoutingMetadata, StepCallbacks,
};
use crate::core::Artifacts;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+.-]*\n(.*?)```").expect("valid regex"));

static FILE_REPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:Created|Modified|Wrote)(?:\s+file)?[:\s]\s*(\S+)\s*$")
        .expect("valid regex")
});

/// Extract code blocks and reported file paths from agent output
pub fn extract_artifacts(output: &str) -> Artifacts {
    let code = CODE_FENCE
        .captures_iter(output)
        .map(|caps| caps[1].trim_end().to_string())
        .collect();

    let files = FILE_REPORT
        .captures_iter(output)
        .map(|caps| caps[1].to_string())
        .collect();

    Artifacts { files, code }
}

/// Adapter that delegates step execution to an external CLI tool
#[derive(Debug, Clone)]
pub struct CliAgent {
    name: String,

    /// Executable name or path
    command: String,

    /// Fixed arguments placed before the prompt
    args: Vec<String>,

    capabilities: AgentCapabilities,
    routing: RoutingMetadata,
}

impl CliAgent {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: vec![],
            capabilities: AgentCapabilities::default(),
            routing: RoutingMetadata::default(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_routing(mut self, routing: RoutingMetadata) -> Self {
        self.routing = routing;
        self
    }

    /// Adapter for the `claude` CLI
    pub fn claude() -> Self {
        Self::new("claude", "claude")
            .with_args(["-p"])
            .with_capabilities(AgentCapabilities::full())
            .with_routing(RoutingMetadata {
                prefer_for: vec!["code".to_string(), "refactor".to_string()],
                avoid_for: vec![],
                priority: 75,
            })
    }

    /// Adapter for the `aider` CLI
    pub fn aider() -> Self {
        Self::new("aider", "aider")
            .with_args(["--yes", "--message"])
            .with_capabilities(AgentCapabilities {
                can_code: true,
                can_edit: true,
                can_read_files: true,
                can_write_files: true,
                supports_streaming: true,
                supports_multi_file: true,
                ..Default::default()
            })
            .with_routing(RoutingMetadata {
                prefer_for: vec!["refactor".to_string()],
                avoid_for: vec!["chat".to_string()],
                priority: 60,
            })
    }

    /// Adapter for the `goose` CLI
    pub fn goose() -> Self {
        Self::new("goose", "goose")
            .with_args(["run", "-t"])
            .with_capabilities(AgentCapabilities {
                can_code: true,
                can_chat: true,
                can_execute_shell: true,
                can_read_files: true,
                can_write_files: true,
                supports_streaming: true,
                ..Default::default()
            })
            .with_routing(RoutingMetadata {
                prefer_for: vec!["debug".to_string(), "shell".to_string()],
                avoid_for: vec![],
                priority: 50,
            })
    }

    #[cfg(test)]
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl ExecutionAgent for CliAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &AgentCapabilities {
        &self.capabilities
    }

    fn routing(&self) -> &RoutingMetadata {
        &self.routing
    }

    async fn check_availability(&self) -> bool {
        which::which(&self.command).is_ok()
    }

    async fn version(&self) -> Option<String> {
        let probe = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match timeout(Duration::from_secs(5), probe).await {
            Ok(Ok(output)) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout);
                text.lines().next().map(|line| line.trim().to_string())
            }
            _ => None,
        }
    }

    async fn execute(
        &self,
        invocation: &AgentInvocation,
        callbacks: &dyn StepCallbacks,
    ) -> Result<AgentOutcome, AgentError> {
        let prompt = invocation.prompt();
        debug!(
            "Spawning '{}' for step {} (prompt length {})",
            self.command,
            invocation.step_id,
            prompt.len()
        );

        let started = Instant::now();
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(&prompt)
            .envs(&invocation.env)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Spawn {
                command: self.command.clone(),
                source: e,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Internal("missing stdout handle".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::Internal("missing stderr handle".to_string()))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut output = String::new();
        let mut errors = String::new();
        let mut out_done = false;
        let mut err_done = false;

        // Stream both pipes incrementally instead of buffering the whole run
        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line {
                    Ok(Some(line)) => {
                        callbacks.on_output(&invocation.step_id, &line);
                        output.push_str(&line);
                        output.push('\n');
                    }
                    Ok(None) => out_done = true,
                    Err(e) => {
                        return Err(AgentError::Internal(format!(
                            "failed to read stdout: {}",
                            e
                        )))
                    }
                },
                line = err_lines.next_line(), if !err_done => match line {
                    Ok(Some(line)) => {
                        callbacks.on_error(&invocation.step_id, &line);
                        errors.push_str(&line);
                        errors.push('\n');
                    }
                    Ok(None) => err_done = true,
                    Err(e) => {
                        return Err(AgentError::Internal(format!(
                            "failed to read stderr: {}",
                            e
                        )))
                    }
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AgentError::Internal(format!("failed to wait for process: {}", e)))?;

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            warn!("'{}' exited with code {}", self.command, code);
            return Err(AgentError::NonZeroExit {
                command: self.command.clone(),
                code,
                stderr: errors.trim().to_string(),
            });
        }

        Ok(AgentOutcome {
            artifacts: extract_artifacts(&output),
            duration_ms: started.elapsed().as_millis() as u64,
            tool_used: self.name.clone(),
            output,
        })
    }
}
