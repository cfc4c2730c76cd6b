//! Step condition expressions

use crate::core::context::RunContext;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static ENV_EQUALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^env\.([A-Za-z_][A-Za-z0-9_]*)\s*==\s*'([^']*)'$").expect("valid regex")
});

/// A parsed condition expression gating step execution.
///
/// Supported forms: `always`, `never`, `previous.success`,
/// `step.<id>.success`, and `env.<NAME> == '<value>'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    Never,
    /// Success flag of the last executed step
    PreviousSuccess,
    /// Success flag of a specific step
    StepSuccess(String),
    /// Environment variable equality
    EnvEquals { name: String, value: String },
}

impl Condition {
    /// Parse a condition expression, returning None for unsupported forms
    pub fn parse(expr: &str) -> Option<Condition> {
        let expr = expr.trim();
        match expr {
            "always" => return Some(Condition::Always),
            "never" => return Some(Condition::Never),
            "previous.success" => return Some(Condition::PreviousSuccess),
            _ => {}
        }

        if let Some(id) = expr
            .strip_prefix("step.")
            .and_then(|rest| rest.strip_suffix(".success"))
        {
            if !id.is_empty() {
                return Some(Condition::StepSuccess(id.to_string()));
            }
        }

        if let Some(caps) = ENV_EQUALS.captures(expr) {
            return Some(Condition::EnvEquals {
                name: caps[1].to_string(),
                value: caps[2].to_string(),
            });
        }

        None
    }

    /// Evaluate the condition against the current run context
    pub fn evaluate(&self, context: &RunContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::PreviousSuccess => context
                .last_executed()
                .map(|result| result.success)
                .unwrap_or(true),
            Condition::StepSuccess(id) => context
                .result(id)
                .map(|result| result.success)
                .unwrap_or(false),
            Condition::EnvEquals { name, value } => {
                context.env_value(name).as_deref() == Some(value.as_str())
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "always"),
            Condition::Never => write!(f, "never"),
            Condition::PreviousSuccess => write!(f, "previous.success"),
            Condition::StepSuccess(id) => write!(f, "step.{}.success", id),
            Condition::EnvEquals { name, value } => write!(f, "env.{} == '{}'", name, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::StepResult;

    fn context_with(results: Vec<StepResult>) -> RunContext {
        let mut context = RunContext::default();
        for result in results {
            context.record(result);
        }
        context
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(Condition::parse("always"), Some(Condition::Always));
        assert_eq!(Condition::parse("never"), Some(Condition::Never));
        assert_eq!(
            Condition::parse(" previous.success "),
            Some(Condition::PreviousSuccess)
        );
    }

    #[test]
    fn test_parse_step_success() {
        assert_eq!(
            Condition::parse("step.build.success"),
            Some(Condition::StepSuccess("build".to_string()))
        );
        assert_eq!(Condition::parse("step..success"), None);
    }

    #[test]
    fn test_parse_env_equals() {
        assert_eq!(
            Condition::parse("env.FOO == 'bar'"),
            Some(Condition::EnvEquals {
                name: "FOO".to_string(),
                value: "bar".to_string(),
            })
        );
        assert_eq!(Condition::parse("env.FOO = bar"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Condition::parse("whenever"), None);
        assert_eq!(Condition::parse(""), None);
    }

    #[test]
    fn test_evaluate_previous_success() {
        let context = context_with(vec![StepResult::succeeded("a", "agent", "ok", 1)]);
        assert!(Condition::PreviousSuccess.evaluate(&context));

        let context = context_with(vec![StepResult::failed("a", "agent", "boom", 1)]);
        assert!(!Condition::PreviousSuccess.evaluate(&context));

        // No previous step at all counts as success
        assert!(Condition::PreviousSuccess.evaluate(&RunContext::default()));
    }

    #[test]
    fn test_evaluate_step_success() {
        let context = context_with(vec![
            StepResult::succeeded("a", "agent", "ok", 1),
            StepResult::failed("b", "agent", "boom", 1),
        ]);
        assert!(Condition::StepSuccess("a".to_string()).evaluate(&context));
        assert!(!Condition::StepSuccess("b".to_string()).evaluate(&context));
        assert!(!Condition::StepSuccess("missing".to_string()).evaluate(&context));
    }

    #[test]
    fn test_evaluate_env_equals() {
        let mut context = RunContext::default();
        context.env.insert("FOO".to_string(), "bar".to_string());

        let matching = Condition::parse("env.FOO == 'bar'").unwrap();
        let mismatched = Condition::parse("env.FOO == 'baz'").unwrap();
        assert!(matching.evaluate(&context));
        assert!(!mismatched.evaluate(&context));
    }

    #[test]
    fn test_display_round_trips() {
        for expr in [
            "always",
            "never",
            "previous.success",
            "step.build.success",
            "env.FOO == 'bar'",
        ] {
            let condition = Condition::parse(expr).unwrap();
            assert_eq!(Condition::parse(&condition.to_string()), Some(condition));
        }
    }
}
