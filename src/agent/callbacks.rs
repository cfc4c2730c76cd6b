//! Streaming callbacks for step execution
//!
//! Agents report progress through this observer set rather than any UI
//! dependency. The runner bridges these into lifecycle events; tests collect
//! them directly.

/// Callbacks invoked while a step executes.
///
/// Object-safe; passed as `&dyn StepCallbacks`. All methods default to no-ops
/// so implementers override only what they need.
pub trait StepCallbacks: Send + Sync {
    /// A step attempt is starting on the given agent
    fn on_start(&self, _step_id: &str, _agent: &str, _attempt: usize) {}

    /// A chunk of agent stdout arrived
    fn on_output(&self, _step_id: &str, _chunk: &str) {}

    /// A chunk of agent stderr arrived
    fn on_error(&self, _step_id: &str, _chunk: &str) {}

    /// The invocation finished (success or not)
    fn on_complete(&self, _step_id: &str, _success: bool) {}
}

/// No-op callback set
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl StepCallbacks for NoopCallbacks {}
