//! Error taxonomy for forwarding-plane operations.

use thiserror::Error;

/// Error type for driver and gateway operations.
///
/// The reconciler routes on these categories: [`HalError::TransientBusy`] is
/// the only retryable error; everything else aborts the current event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// The referenced object does not exist.
    #[error("object not found")]
    NotFound,

    /// The object to create already exists.
    #[error("object already exists")]
    AlreadyExists,

    /// A hardware table or resource pool is exhausted.
    #[error("hardware resources exhausted")]
    ResourceExhausted,

    /// The driver is temporarily unable to serve the request.
    #[error("driver busy, retry later")]
    TransientBusy,

    /// Unrecoverable driver failure.
    #[error("fatal driver error: {0}")]
    Fatal(String),
}

impl HalError {
    /// Creates a fatal error with a message.
    pub fn fatal(message: impl Into<String>) -> Self {
        HalError::Fatal(message.into())
    }

    /// Returns true if the operation may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HalError::TransientBusy)
    }
}

/// Result type for forwarding-plane operations.
pub type HalResult<T> = Result<T, HalError>;
