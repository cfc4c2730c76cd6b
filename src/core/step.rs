//! Step domain model and task-type inference

use crate::core::condition::Condition;
use crate::core::config::StepConfig;

/// Default per-step timeout when neither the step nor the pipeline sets one
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// Ordered keyword table for inferring a task type from task text.
/// First matching rule wins.
const TASK_TYPE_RULES: &[(&[&str], &str)] = &[
    (&["analyze", "review"], "analyze"),
    (&["test", "spec"], "test"),
    (&["refactor", "cleanup"], "refactor"),
    (&["debug", "fix bug"], "debug"),
    (&["document", "readme"], "document"),
    (&["explain", "what is"], "explain"),
    (&["implement", "create", "add"], "code"),
];

/// Infer a task type from free-form task text
pub fn infer_task_type(task: &str) -> &'static str {
    let task = task.to_lowercase();
    for (keywords, task_type) in TASK_TYPE_RULES {
        if keywords.iter().any(|keyword| task.contains(keyword)) {
            return task_type;
        }
    }
    "code"
}

/// Retry policy: total attempts including the first, and the pause between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Human-approval gate; present only when enabled in the definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gate {
    pub message: Option<String>,
}

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name
    pub name: String,

    pub description: Option<String>,

    /// Explicit agent name; wins over task-type routing
    pub tool: Option<String>,

    /// Task type for capability-based routing; inferred when absent
    pub task_type: Option<String>,

    /// Task text template with `${VAR}` placeholders
    pub task: String,

    /// Files the step operates on (also interpolated)
    pub files: Vec<String>,

    /// Step ids this step depends on
    pub depends_on: Vec<String>,

    pub condition: Option<Condition>,

    pub retry: RetryPolicy,

    pub timeout_ms: u64,

    pub gate: Option<Gate>,

    /// Step executed once as recovery when this step fails
    pub on_failure: Option<String>,

    /// Informational output labels
    pub outputs: Vec<String>,
}

impl Step {
    /// Build the domain step from its validated config
    pub fn from_config(config: &StepConfig, default_timeout_ms: u64) -> Self {
        let id = config.id.clone().unwrap_or_default();
        let name = config.name.clone().unwrap_or_else(|| id.clone());

        let retry = config
            .retry
            .as_ref()
            .map(|r| RetryPolicy {
                max_attempts: r.max_attempts.max(1),
                delay_ms: r.delay_ms,
            })
            .unwrap_or_default();

        let gate = config.gate.as_ref().filter(|g| g.enabled).map(|g| Gate {
            message: g.message.clone(),
        });

        // Validation already guarantees the condition parses
        let condition = config
            .condition
            .as_deref()
            .and_then(Condition::parse);

        Step {
            id,
            name,
            description: config.description.clone(),
            tool: config.tool.clone(),
            task_type: config.task_type.clone(),
            task: config.task.clone().unwrap_or_default(),
            files: config.files.clone(),
            depends_on: config.depends_on.clone(),
            condition,
            retry,
            timeout_ms: config.timeout_ms.unwrap_or(default_timeout_ms),
            gate,
            on_failure: config.on_failure.clone(),
            outputs: config.outputs.clone(),
        }
    }

    /// Task type used for routing: the explicit field, or inferred from text
    pub fn resolved_task_type(&self) -> String {
        self.task_type
            .clone()
            .unwrap_or_else(|| infer_task_type(&self.task).to_string())
    }

    #[cfg(test)]
    pub fn for_test(id: &str, task: &str) -> Self {
        Step {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            tool: None,
            task_type: None,
            task: task.to_string(),
            files: vec![],
            depends_on: vec![],
            condition: None,
            retry: RetryPolicy::none(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            gate: None,
            on_failure: None,
            outputs: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_task_type_table() {
        assert_eq!(infer_task_type("Analyze the module layout"), "analyze");
        assert_eq!(infer_task_type("review this PR"), "analyze");
        assert_eq!(infer_task_type("write a test for the parser"), "test");
        assert_eq!(infer_task_type("add a spec for retries"), "test");
        assert_eq!(infer_task_type("refactor the config loader"), "refactor");
        assert_eq!(infer_task_type("general cleanup of imports"), "refactor");
        assert_eq!(infer_task_type("fix bug in the scheduler"), "debug");
        assert_eq!(infer_task_type("document the public API"), "document");
        assert_eq!(infer_task_type("update the readme"), "document");
        assert_eq!(infer_task_type("what is a topological sort"), "explain");
        assert_eq!(infer_task_type("implement the parser"), "code");
        assert_eq!(infer_task_type("create a new module"), "code");
    }

    #[test]
    fn test_infer_task_type_order_matters() {
        // "test" appears before "implement" in the table
        assert_eq!(infer_task_type("implement a test harness"), "test");
        // "analyze" outranks everything
        assert_eq!(infer_task_type("analyze and refactor"), "analyze");
    }

    #[test]
    fn test_infer_task_type_default() {
        assert_eq!(infer_task_type("do something unusual"), "code");
        assert_eq!(infer_task_type(""), "code");
    }

    #[test]
    fn test_resolved_task_type_prefers_explicit() {
        let mut step = Step::for_test("s", "analyze everything");
        assert_eq!(step.resolved_task_type(), "analyze");

        step.task_type = Some("shell".to_string());
        assert_eq!(step.resolved_task_type(), "shell");
    }

    #[test]
    fn test_retry_policy_floor() {
        use crate::core::config::RetryConfig;
        let config = StepConfig {
            id: Some("s".to_string()),
            name: Some("s".to_string()),
            description: None,
            tool: None,
            task_type: None,
            task: Some("work".to_string()),
            files: vec![],
            depends_on: vec![],
            condition: None,
            retry: Some(RetryConfig {
                max_attempts: 0,
                delay_ms: 5,
            }),
            timeout_ms: None,
            gate: None,
            on_failure: None,
            outputs: vec![],
        };

        let step = Step::from_config(&config, DEFAULT_TIMEOUT_MS);
        // maxAttempts 0 still means one attempt
        assert_eq!(step.retry.max_attempts, 1);
        assert_eq!(step.retry.delay_ms, 5);
        assert_eq!(step.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_disabled_gate_is_dropped() {
        use crate::core::config::GateConfig;
        let config = StepConfig {
            id: Some("s".to_string()),
            name: Some("s".to_string()),
            description: None,
            tool: None,
            task_type: None,
            task: Some("work".to_string()),
            files: vec![],
            depends_on: vec![],
            condition: None,
            retry: None,
            timeout_ms: None,
            gate: Some(GateConfig {
                enabled: false,
                message: Some("never shown".to_string()),
            }),
            on_failure: None,
            outputs: vec![],
        };

        let step = Step::from_config(&config, DEFAULT_TIMEOUT_MS);
        assert!(step.gate.is_none());
    }
}
