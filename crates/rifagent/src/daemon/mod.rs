//! Drain-cycle daemon.

use nos_orch_common::Orch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Pause between drain cycles when nothing is pending.
    pub drain_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: 100,
        }
    }
}

/// Runs registered orchestration agents in priority order.
///
/// Each cycle calls [`Orch::do_task`] on every agent with pending work.
/// Deferred events stay in the agents' consumers and are retried on the
/// next cycle.
pub struct Daemon {
    config: DaemonConfig,
    orchs: Vec<Box<dyn Orch>>,
    running: Arc<AtomicBool>,
}

impl Daemon {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            orchs: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Registers an agent. Agents run each cycle in ascending priority.
    pub fn register(&mut self, orch: Box<dyn Orch>) {
        info!(name = orch.name(), priority = orch.priority(), "registered orch");
        self.orchs.push(orch);
        self.orchs.sort_by_key(|o| o.priority());
    }

    /// Returns a handle that stops the run loop.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Runs one drain cycle over all agents.
    pub async fn run_once(&mut self) {
        for orch in &mut self.orchs {
            if orch.has_pending_tasks() {
                debug!(name = orch.name(), "draining");
                orch.do_task().await;
            }
        }
    }

    /// Runs drain cycles until the stop handle is cleared.
    pub async fn run(&mut self) {
        info!(orchs = self.orchs.len(), "daemon event loop started");

        let interval = Duration::from_millis(self.config.drain_interval_ms);
        while self.running.load(Ordering::SeqCst) {
            self.run_once().await;
            tokio::time::sleep(interval).await;
        }

        info!("daemon event loop stopped");
    }

    /// Dumps pending work across all agents for debugging.
    pub fn dump_pending(&self) -> Vec<String> {
        self.orchs
            .iter()
            .flat_map(|o| {
                o.dump_pending_tasks()
                    .into_iter()
                    .map(move |t| format!("{}: {}", o.name(), t))
            })
            .collect()
    }
}
