//! Publisher error type.

use thiserror::Error;

/// Errors from the application-bus boundary.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connection error: {0}")]
    Connection(String),

    #[error("bus command error: {0}")]
    Command(String),
}
