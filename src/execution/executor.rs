//! Single-step execution: routing, interpolation, timeout and retry
//!
//! The executor never returns an error. Every path, including routing
//! failures and timeouts, is captured in the `StepResult` so the runner can
//! aggregate and report uniformly.

use crate::agent::{AgentError, AgentInvocation, AgentRegistry, ExecutionAgent, StepCallbacks};
use crate::core::{RunContext, Step, StepResult};
use crate::execution::CancelFlag;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

pub struct StepExecutor {
    registry: Arc<AgentRegistry>,
}

impl StepExecutor {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Run one step to a `StepResult`.
    ///
    /// Evaluates the condition, resolves an agent, interpolates the task, and
    /// drives the attempt loop. Cancellation and timeout both abort the
    /// in-flight invocation by dropping its future, which kills the agent
    /// process.
    pub async fn execute(
        &self,
        step: &Step,
        context: &RunContext,
        callbacks: &dyn StepCallbacks,
        cancel: &CancelFlag,
    ) -> StepResult {
        if let Some(condition) = &step.condition {
            if !condition.evaluate(context) {
                debug!("Skipping step '{}': condition '{}' not met", step.id, condition);
                return StepResult::skipped(
                    &step.id,
                    format!("condition '{}' not met", condition),
                );
            }
        }

        let started = Instant::now();

        let agent = match self.resolve_agent(step) {
            Ok(agent) => agent,
            Err(error) => {
                warn!("Step '{}' failed routing: {}", step.id, error);
                return StepResult::failed(&step.id, "", error, elapsed_ms(started));
            }
        };

        let invocation = match self.build_invocation(step, context) {
            Ok(invocation) => invocation,
            Err(error) => {
                return StepResult::failed(&step.id, agent.name(), error, elapsed_ms(started));
            }
        };

        let mut last_error = String::new();
        for attempt in 1..=step.retry.max_attempts {
            if attempt > 1 && step.retry.delay_ms > 0 {
                // The retry pause must also observe cancellation
                tokio::select! {
                    _ = cancel.cancelled() => {
                        last_error = AgentError::Cancelled.to_string();
                        break;
                    }
                    _ = sleep(Duration::from_millis(step.retry.delay_ms)) => {}
                }
            }

            callbacks.on_start(&step.id, agent.name(), attempt);
            debug!(
                "Step '{}' attempt {}/{} on agent '{}'",
                step.id,
                attempt,
                step.retry.max_attempts,
                agent.name()
            );

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(AgentError::Cancelled),
                run = timeout(
                    Duration::from_millis(step.timeout_ms),
                    agent.execute(&invocation, callbacks),
                ) => match run {
                    Ok(inner) => inner,
                    Err(_) => Err(AgentError::Timeout(step.timeout_ms)),
                },
            };

            match outcome {
                Ok(outcome) => {
                    callbacks.on_complete(&step.id, true);
                    return StepResult::succeeded(
                        &step.id,
                        agent.name(),
                        outcome.output,
                        elapsed_ms(started),
                    )
                    .with_artifacts(outcome.artifacts);
                }
                Err(AgentError::Cancelled) => {
                    // No retries after a cancellation request
                    last_error = AgentError::Cancelled.to_string();
                    break;
                }
                Err(error) => {
                    warn!(
                        "Step '{}' attempt {}/{} failed: {}",
                        step.id, attempt, step.retry.max_attempts, error
                    );
                    last_error = error.to_string();
                }
            }
        }

        callbacks.on_complete(&step.id, false);
        StepResult::failed(&step.id, agent.name(), last_error, elapsed_ms(started))
    }

    /// Explicit tool assignment wins; otherwise route by task type
    fn resolve_agent(&self, step: &Step) -> Result<Arc<dyn ExecutionAgent>, String> {
        match &step.tool {
            Some(tool) => self
                .registry
                .get(tool)
                .ok_or_else(|| format!("routing error: tool '{}' is not registered", tool)),
            None => {
                let task_type = step.resolved_task_type();
                self.registry.find_best_tool(&task_type).ok_or_else(|| {
                    format!(
                        "routing error: no capable agent for task type '{}'",
                        task_type
                    )
                })
            }
        }
    }

    fn build_invocation(&self, step: &Step, context: &RunContext) -> Result<AgentInvocation, String> {
        let task = context
            .interpolate(&step.task)
            .map_err(|name| format!("unresolved variable '{}'", name))?;

        let mut files = Vec::with_capacity(step.files.len());
        for file in &step.files {
            files.push(
                context
                    .interpolate(file)
                    .map_err(|name| format!("unresolved variable '{}'", name))?,
            );
        }

        Ok(AgentInvocation {
            step_id: step.id.clone(),
            task,
            files,
            previous_output: context.dependency_context(step),
            env: context.env.clone(),
            working_dir: context.project_root.clone(),
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
