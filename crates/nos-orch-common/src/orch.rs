//! Base Orch trait.

use async_trait::async_trait;

/// Base trait for orchestration agents.
///
/// The daemon calls [`Orch::do_task`] whenever an agent has pending work;
/// an agent drains its consumers there, translating events into
/// forwarding-plane calls and re-queueing whatever must be retried.
#[async_trait]
pub trait Orch: Send + Sync {
    /// Returns the name of this Orch (for logging and debugging).
    fn name(&self) -> &str;

    /// Processes pending events from all consumers.
    async fn do_task(&mut self);

    /// Returns the priority of this Orch (lower = higher priority).
    fn priority(&self) -> i32 {
        0
    }

    /// Returns true if this Orch has pending work.
    fn has_pending_tasks(&self) -> bool {
        false
    }

    /// Dumps pending tasks for debugging.
    fn dump_pending_tasks(&self) -> Vec<String> {
        vec![]
    }
}
