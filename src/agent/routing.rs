//! Routing metadata for agent selection

use serde::{Deserialize, Serialize};

/// Priority boost applied when an agent prefers a task type
pub const PREFERENCE_BONUS: i32 = 50;

/// Default agent priority
pub const DEFAULT_PRIORITY: i32 = 50;

/// Per-agent routing hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingMetadata {
    /// Task types this agent should be preferred for
    #[serde(default)]
    pub prefer_for: Vec<String>,

    /// Task types this agent must never be routed
    #[serde(default)]
    pub avoid_for: Vec<String>,

    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl Default for RoutingMetadata {
    fn default() -> Self {
        Self {
            prefer_for: vec![],
            avoid_for: vec![],
            priority: DEFAULT_PRIORITY,
        }
    }
}

impl RoutingMetadata {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    /// Ranking score for a task type
    pub fn score(&self, task_type: &str) -> i32 {
        if self.prefer_for.iter().any(|t| t == task_type) {
            self.priority + PREFERENCE_BONUS
        } else {
            self.priority
        }
    }

    pub fn avoids(&self, task_type: &str) -> bool {
        self.avoid_for.iter().any(|t| t == task_type)
    }
}
