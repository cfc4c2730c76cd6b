//! Sequential pipeline runner
//!
//! Drives steps in dependency order, bridges streaming callbacks into
//! lifecycle events, holds runs at approval gates, and aggregates step
//! results and artifacts into the final `PipelineResult`.

use crate::agent::{AgentRegistry, StepCallbacks};
use crate::core::{
    Artifacts, DefinitionError, Pipeline, PipelineResult, RetryPolicy, RunContext, StepResult,
};
use crate::execution::{CancelFlag, StepExecutor};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle events emitted during a run
#[derive(Debug, Clone)]
pub enum RunEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
    },
    StepStarted {
        step_id: String,
        agent: String,
        attempt: usize,
    },
    /// A line of agent output (stdout or stderr)
    StepOutput {
        step_id: String,
        chunk: String,
    },
    StepCompleted {
        result: StepResult,
    },
    /// The run is held at an approval gate
    GateWaiting {
        step_id: String,
        message: String,
    },
    /// A failed step's recovery handler is about to run
    StepRecovering {
        step_id: String,
        handler: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        success: bool,
    },
}

pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Decides whether a gated step may proceed
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    async fn approve(&self, step_id: &str, message: &str) -> bool;
}

/// Approves every gate; for non-interactive runs
pub struct AutoApprove;

#[async_trait]
impl ApprovalHandler for AutoApprove {
    async fn approve(&self, _step_id: &str, _message: &str) -> bool {
        true
    }
}

/// Per-run options supplied by the caller
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Variable overrides merged over the pipeline defaults
    pub variables: HashMap<String, String>,

    /// Working directory for agent processes
    pub project_root: PathBuf,

    /// Fail on unresolved `${VAR}` placeholders
    pub strict_vars: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            variables: HashMap::new(),
            project_root: PathBuf::from("."),
            strict_vars: false,
        }
    }
}

/// Bridges per-step callbacks into run events
struct EventCallbacks {
    events: Option<EventHandler>,
}

impl EventCallbacks {
    fn emit(&self, event: RunEvent) {
        if let Some(handler) = &self.events {
            handler(event);
        }
    }
}

impl StepCallbacks for EventCallbacks {
    fn on_start(&self, step_id: &str, agent: &str, attempt: usize) {
        self.emit(RunEvent::StepStarted {
            step_id: step_id.to_string(),
            agent: agent.to_string(),
            attempt,
        });
    }

    fn on_output(&self, step_id: &str, chunk: &str) {
        self.emit(RunEvent::StepOutput {
            step_id: step_id.to_string(),
            chunk: chunk.to_string(),
        });
    }

    fn on_error(&self, step_id: &str, chunk: &str) {
        self.emit(RunEvent::StepOutput {
            step_id: step_id.to_string(),
            chunk: chunk.to_string(),
        });
    }
}

/// Runs pipelines sequentially in dependency order.
///
/// A failed step halts the run after its recovery handler (if any); a denied
/// gate halts it immediately. Either way the result carries every step
/// reached so far.
pub struct PipelineRunner {
    executor: StepExecutor,
    events: Option<EventHandler>,
    approvals: Arc<dyn ApprovalHandler>,
    cancel: CancelFlag,
}

impl PipelineRunner {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            executor: StepExecutor::new(registry),
            events: None,
            approvals: Arc::new(AutoApprove),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_event_handler(mut self, handler: EventHandler) -> Self {
        self.events = Some(handler);
        self
    }

    pub fn with_approval_handler(mut self, handler: Arc<dyn ApprovalHandler>) -> Self {
        self.approvals = handler;
        self
    }

    /// Handle callers can use to cancel the run from another task
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the pipeline to completion or first halt.
    ///
    /// Returns `Err` only for definition-level problems (a dependency cycle);
    /// step failures are reported inside the `PipelineResult`.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        options: RunOptions,
    ) -> Result<PipelineResult, DefinitionError> {
        let order = pipeline.execution_order()?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();

        info!("Starting pipeline '{}' (run {})", pipeline.name, run_id);
        self.emit(RunEvent::PipelineStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
        });

        let mut context = RunContext::for_run(pipeline, options.variables, options.project_root);
        context.strict_vars = options.strict_vars;

        let callbacks = EventCallbacks {
            events: self.events.clone(),
        };

        let mut step_results = Vec::new();
        let mut artifacts = Artifacts::default();
        let mut success = true;
        let mut error = None;

        for step_id in &order {
            // Order only contains ids produced from the pipeline's own steps
            let step = match pipeline.step(step_id) {
                Some(step) => step,
                None => continue,
            };

            if self.cancel.is_cancelled() {
                success = false;
                error = Some("run cancelled".to_string());
                break;
            }

            // A step conditioned out skips before its gate can prompt anyone
            if let Some(condition) = &step.condition {
                if !condition.evaluate(&context) {
                    let result = StepResult::skipped(
                        &step.id,
                        format!("condition '{}' not met", condition),
                    );
                    self.emit(RunEvent::StepCompleted {
                        result: result.clone(),
                    });
                    step_results.push(result.clone());
                    context.record(result);
                    continue;
                }
            }

            if let Some(gate) = &step.gate {
                let message = gate
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Approve step '{}'?", step.name));
                self.emit(RunEvent::GateWaiting {
                    step_id: step.id.clone(),
                    message: message.clone(),
                });

                if !self.approvals.approve(&step.id, &message).await {
                    warn!("Gate denied before step '{}'", step.id);
                    success = false;
                    error = Some(format!("stopped at gate before step '{}'", step.id));
                    break;
                }
            }

            let result = self
                .executor
                .execute(step, &context, &callbacks, &self.cancel)
                .await;

            artifacts.extend(&result.artifacts);
            let step_failed = !result.success;
            let step_error = result.error.clone();
            self.emit(RunEvent::StepCompleted {
                result: result.clone(),
            });
            step_results.push(result.clone());
            context.record(result);

            if step_failed {
                if let Some(handler_id) = &step.on_failure {
                    // Validation guarantees the handler id exists
                    if let Some(handler) = pipeline.step(handler_id) {
                        let recovery_result = self
                            .run_recovery(step, handler, &context, &callbacks)
                            .await;
                        artifacts.extend(&recovery_result.artifacts);
                        self.emit(RunEvent::StepCompleted {
                            result: recovery_result.clone(),
                        });
                        step_results.push(recovery_result.clone());
                        context.record(recovery_result);
                    }
                }

                success = false;
                error = step_error
                    .or_else(|| Some(format!("step '{}' failed", step.id)));
                break;
            }
        }

        self.emit(RunEvent::PipelineCompleted { run_id, success });
        info!(
            "Pipeline '{}' finished (success: {})",
            pipeline.name, success
        );

        Ok(PipelineResult {
            pipeline_name: pipeline.name.clone(),
            run_id,
            success,
            started_at,
            total_duration_ms: started.elapsed().as_millis() as u64,
            step_results,
            error,
            artifacts,
        })
    }

    /// Run a failure handler once: retries disabled, condition cleared so the
    /// handler always runs in recovery even if it is conditioned out of the
    /// normal flow.
    async fn run_recovery(
        &self,
        failed: &crate::core::Step,
        handler: &crate::core::Step,
        context: &RunContext,
        callbacks: &EventCallbacks,
    ) -> StepResult {
        info!(
            "Step '{}' failed, running recovery handler '{}'",
            failed.id, handler.id
        );
        self.emit(RunEvent::StepRecovering {
            step_id: failed.id.clone(),
            handler: handler.id.clone(),
        });

        let mut recovery = handler.clone();
        recovery.retry = RetryPolicy::none();
        recovery.condition = None;

        self.executor
            .execute(&recovery, context, callbacks, &self.cancel)
            .await
    }

    fn emit(&self, event: RunEvent) {
        if let Some(handler) = &self.events {
            handler(event);
        }
    }
}
