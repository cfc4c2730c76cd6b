//! Agent registry and capability-based routing

use crate::agent::{CliAgent, ExecutionAgent};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::debug;

/// Holds the agents available to a run.
///
/// Constructed and injected by the caller; there is deliberately no global
/// default instance, so tests swap in doubles freely.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn ExecutionAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the builtin CLI adapters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CliAgent::claude()));
        registry.register(Arc::new(CliAgent::aider()));
        registry.register(Arc::new(CliAgent::goose()));
        registry
    }

    pub fn register(&mut self, agent: Arc<dyn ExecutionAgent>) {
        debug!("Registering agent '{}'", agent.name());
        self.agents.push(agent);
    }

    /// Look up an agent by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ExecutionAgent>> {
        self.agents.iter().find(|a| a.name() == name).cloned()
    }

    /// All registered agents, in registration order
    pub fn all(&self) -> &[Arc<dyn ExecutionAgent>] {
        &self.agents
    }

    /// Probe every agent's liveness and return the responsive ones
    pub async fn available(&self) -> Vec<Arc<dyn ExecutionAgent>> {
        let mut available = Vec::new();
        for agent in &self.agents {
            if agent.check_availability().await {
                available.push(agent.clone());
            }
        }
        available
    }

    /// Pick the best agent for a task type.
    ///
    /// Filter by the capability requirement table and `avoidFor`, rank by
    /// priority (with the prefer bonus). The sort is stable, so ties keep
    /// registration order.
    pub fn find_best_tool(&self, task_type: &str) -> Option<Arc<dyn ExecutionAgent>> {
        let mut candidates: Vec<&Arc<dyn ExecutionAgent>> = self
            .agents
            .iter()
            .filter(|a| a.supports_task(task_type))
            .collect();

        candidates.sort_by_key(|a| Reverse(a.priority_for(task_type)));

        let best = candidates.into_iter().next().cloned();
        match &best {
            Some(agent) => debug!("Routed task type '{}' to '{}'", task_type, agent.name()),
            None => debug!("No qualifying agent for task type '{}'", task_type),
        }
        best
    }
}
