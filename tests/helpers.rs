//! Test utilities for taskpipe integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use taskpipe::agent::{
    AgentCapabilities, AgentError, AgentInvocation, AgentOutcome, AgentRegistry, ExecutionAgent,
    RoutingMetadata, StepCallbacks,
};
use taskpipe::core::config::PipelineConfig;
use taskpipe::core::{Artifacts, Pipeline, PipelineResult};
use taskpipe::execution::{ApprovalHandler, PipelineRunner, RunOptions};

/// Scripted agent for integration tests.
///
/// Succeeds by default; individual steps can be scripted to return a fixed
/// output or to fail their first N invocations. Every invocation is recorded
/// so tests can inspect prompts and call counts.
pub struct StubAgent {
    name: String,
    capabilities: AgentCapabilities,
    routing: RoutingMetadata,
    responses: HashMap<String, String>,
    artifacts: HashMap<String, Artifacts>,
    failures: Mutex<HashMap<String, usize>>,
    invocations: Mutex<Vec<AgentInvocation>>,
}

impl StubAgent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            capabilities: AgentCapabilities::full(),
            routing: RoutingMetadata::default(),
            responses: HashMap::new(),
            artifacts: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.routing.priority = priority;
        self
    }

    pub fn prefer(mut self, task_type: &str) -> Self {
        self.routing.prefer_for.push(task_type.to_string());
        self
    }

    pub fn avoid(mut self, task_type: &str) -> Self {
        self.routing.avoid_for.push(task_type.to_string());
        self
    }

    /// Fixed output for a specific step
    pub fn respond(mut self, step_id: &str, output: &str) -> Self {
        self.responses.insert(step_id.to_string(), output.to_string());
        self
    }

    /// Artifacts reported alongside the step's output
    pub fn produce(mut self, step_id: &str, artifacts: Artifacts) -> Self {
        self.artifacts.insert(step_id.to_string(), artifacts);
        self
    }

    /// Fail the first `count` invocations of a step
    pub fn fail_first(self, step_id: &str, count: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(step_id.to_string(), count);
        self
    }

    /// How many times a step was invoked
    pub fn call_count(&self, step_id: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.step_id == step_id)
            .count()
    }

    /// All recorded invocations of a step
    pub fn invocations_for(&self, step_id: &str) -> Vec<AgentInvocation> {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.step_id == step_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ExecutionAgent for StubAgent {
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
        true
    }

    async fn version(&self) -> Option<String> {
        Some("stub 0.0".to_string())
    }

    async fn execute(
        &self,
        invocation: &AgentInvocation,
        callbacks: &dyn StepCallbacks,
    ) -> Result<AgentOutcome, AgentError> {
        self.invocations.lock().unwrap().push(invocation.clone());

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&invocation.step_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(AgentError::Internal(format!(
                        "injected failure for '{}'",
                        invocation.step_id
                    )));
                }
            }
        }

        let output = self
            .responses
            .get(&invocation.step_id)
            .cloned()
            .unwrap_or_else(|| format!("ran {}", invocation.step_id));
        callbacks.on_output(&invocation.step_id, &output);

        Ok(AgentOutcome {
            output,
            artifacts: self
                .artifacts
                .get(&invocation.step_id)
                .cloned()
                .unwrap_or_default(),
            duration_ms: 1,
            tool_used: self.name.clone(),
        })
    }
}

/// Approval handler that denies every gate
pub struct DenyGates;

#[async_trait]
impl ApprovalHandler for DenyGates {
    async fn approve(&self, _step_id: &str, _message: &str) -> bool {
        false
    }
}

/// Approval handler that approves only the listed steps
pub struct ApproveOnly(pub Vec<String>);

#[async_trait]
impl ApprovalHandler for ApproveOnly {
    async fn approve(&self, step_id: &str, _message: &str) -> bool {
        self.0.iter().any(|id| id == step_id)
    }
}

/// Parse a pipeline from YAML, panicking on any definition error
pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    PipelineConfig::from_yaml(yaml)
        .unwrap_or_else(|e| panic!("Failed to parse pipeline YAML: {}", e))
        .to_pipeline()
        .unwrap_or_else(|e| panic!("Failed to build pipeline: {}", e))
}

/// Registry holding the given agents, in order
pub fn registry_with(agents: Vec<Arc<dyn ExecutionAgent>>) -> Arc<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    for agent in agents {
        registry.register(agent);
    }
    Arc::new(registry)
}

/// Run a pipeline with a single stub agent and default options
pub async fn run_with_agent(pipeline: &Pipeline, agent: Arc<StubAgent>) -> PipelineResult {
    run_with_registry(pipeline, registry_with(vec![agent]), RunOptions::default()).await
}

/// Run a pipeline against a prepared registry
pub async fn run_with_registry(
    pipeline: &Pipeline,
    registry: Arc<AgentRegistry>,
    options: RunOptions,
) -> PipelineResult {
    PipelineRunner::new(registry)
        .run(pipeline, options)
        .await
        .unwrap_or_else(|e| panic!("Run failed to start: {}", e))
}

/// Assert the run succeeded
pub fn assert_run_succeeded(result: &PipelineResult) {
    assert!(
        result.success,
        "Run should have succeeded, but failed with: {:?}",
        result.error
    );
}

/// Assert the run failed, optionally checking the error message
pub fn assert_run_failed(result: &PipelineResult, expected_error: &str) {
    assert!(!result.success, "Run should have failed but succeeded");
    let error = result.error.as_deref().unwrap_or("");
    assert!(
        error.contains(expected_error),
        "Run error:\n{}\n\ndoes not contain:\n{}",
        error,
        expected_error
    );
}

/// Assert the steps were reached in exactly this order
pub fn assert_executed_order(result: &PipelineResult, expected: &[&str]) {
    assert_eq!(
        result.executed_order(),
        expected,
        "Unexpected execution order"
    );
}

/// Assert a step ran (not skipped) and succeeded, and check its output
pub fn assert_step_ran(result: &PipelineResult, step_id: &str, expected_output: &str) {
    let step = result
        .step(step_id)
        .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id));
    assert!(!step.skipped, "Step '{}' was skipped", step_id);
    assert!(
        step.success,
        "Step '{}' failed: {:?}",
        step_id, step.error
    );
    assert!(
        step.output.contains(expected_output),
        "Step '{}' output:\n{}\n\ndoes not contain:\n{}",
        step_id,
        step.output,
        expected_output
    );
}

/// Assert a step was skipped with the given reason fragment
pub fn assert_step_skipped(result: &PipelineResult, step_id: &str, expected_reason: &str) {
    let step = result
        .step(step_id)
        .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id));
    assert!(step.skipped, "Step '{}' was not skipped", step_id);
    let reason = step.skip_reason.as_deref().unwrap_or("");
    assert!(
        reason.contains(expected_reason),
        "Step '{}' skip reason:\n{}\n\ndoes not contain:\n{}",
        step_id,
        reason,
        expected_reason
    );
}

/// Assert a step failed with the given error fragment
pub fn assert_step_failed(result: &PipelineResult, step_id: &str, expected_error: &str) {
    let step = result
        .step(step_id)
        .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id));
    assert!(
        !step.success && !step.skipped,
        "Step '{}' should have failed, got success={} skipped={}",
        step_id,
        step.success,
        step.skipped
    );
    let error = step.error.as_deref().unwrap_or("");
    assert!(
        error.contains(expected_error),
        "Step '{}' error:\n{}\n\ndoes not contain:\n{}",
        step_id,
        error,
        expected_error
    );
}
