//! Execution agents: pluggable providers that run pipeline steps

pub mod callbacks;
pub mod capabilities;
pub mod outcome;
pub mod registry;
pub mod routing;
pub mod subprocess;

use async_trait::async_trait;
pub use callbacks::{NoopCallbacks, StepCallbacks};
pub use capabilities::AgentCapabilities;
pub use outcome::{AgentError, AgentInvocation, AgentOutcome};
pub use registry::AgentRegistry;
pub use routing::RoutingMetadata;
pub use subprocess::CliAgent;

/// An interchangeable execution agent.
///
/// Implementations are typically adapters around external CLI tools; the
/// scheduler never branches on agent identity, only on this interface and
/// the capability/routing data it exposes.
#[async_trait]
pub trait ExecutionAgent: Send + Sync {
    /// Registry name, also used for explicit `tool:` assignment
    fn name(&self) -> &str;

    fn capabilities(&self) -> &AgentCapabilities;

    fn routing(&self) -> &RoutingMetadata;

    /// Liveness probe; only responsive agents are reported available
    async fn check_availability(&self) -> bool;

    /// Tool version string, when the agent can report one
    async fn version(&self) -> Option<String>;

    /// Run one invocation, streaming progress through the callbacks
    async fn execute(
        &self,
        invocation: &AgentInvocation,
        callbacks: &dyn StepCallbacks,
    ) -> Result<AgentOutcome, AgentError>;

    /// Whether this agent qualifies for a task type at all
    fn supports_task(&self, task_type: &str) -> bool {
        self.capabilities().meets_requirements(task_type) && !self.routing().avoids(task_type)
    }

    /// Ranking score for a task type
    fn priority_for(&self, task_type: &str) -> i32 {
        self.routing().score(task_type)
    }
}
