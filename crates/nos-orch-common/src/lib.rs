//! Common orchestration plumbing for the control-plane agents.
//!
//! - [`Consumer`]: ordered per-key pending map fed from the configuration
//!   bus; draining consumes, [`Consumer::retry`] defers an event to the next
//!   drain cycle.
//! - [`TaskStatus`] / [`TaskError`]: how an agent reports the outcome of one
//!   event to its drain loop.
//! - [`Orch`]: the trait every orchestration agent implements toward the
//!   daemon.

mod consumer;
mod orch;
mod task;

pub use consumer::{Consumer, ConsumerConfig, FieldValue, KeyOpFieldsValues, Operation};
pub use orch::Orch;
pub use task::{TaskError, TaskResult, TaskResultExt, TaskStatus};
