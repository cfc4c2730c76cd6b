//! Pipeline execution: per-step executor and the sequential runner

pub mod executor;
pub mod runner;

pub use executor::StepExecutor;
pub use runner::{
    ApprovalHandler, AutoApprove, EventHandler, PipelineRunner, RunEvent, RunOptions,
};

use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation signal shared between a run and its caller.
///
/// Cloning is cheap; every clone observes the same flag. Cancellation is
/// one-way and sticky.
#[derive(Debug, Clone)]
pub struct CancelFlag {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation of the run
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Cannot fail: we hold the sender through the Arc
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}
