//! Task processing status and result types.

use thiserror::Error;

/// Outcome of processing a single event.
///
/// The drain loop consumes events whose status `is_success` or
/// `is_failure`, and re-queues events whose status `is_retryable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Event applied
    Success,
    /// Event was malformed; consumed and logged
    InvalidEntry,
    /// Event failed permanently; consumed to avoid a poison loop
    Failed,
    /// Event must be retried on the next drain cycle
    NeedRetry,
    /// Event was a duplicate of applied state
    Duplicated,
    /// Event is waiting for a missing dependency
    WaitingForDependency,
}

impl TaskStatus {
    /// Returns true if the event completed.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Duplicated)
    }

    /// Returns true if the event must stay pending.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskStatus::NeedRetry | TaskStatus::WaitingForDependency)
    }

    /// Returns true if the event failed permanently.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::InvalidEntry | TaskStatus::Failed)
    }
}

/// Error type for event processing failures.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// Event data could not be decoded
    #[error("invalid entry: {message}")]
    InvalidEntry { message: String },

    /// The forwarding plane rejected the operation permanently
    #[error("hardware error: {message}")]
    HardwareFailure { message: String },

    /// The forwarding plane is busy; retry on the next drain
    #[error("retry needed: {reason}")]
    NeedRetry { reason: String },

    /// A collaborator (port, VRF, VNet) is not present yet
    #[error("waiting for dependency: {dependency}")]
    WaitingForDependency { dependency: String },

    /// The event matched already-applied state
    #[error("duplicate: {reason}")]
    Duplicated { reason: String },
}

impl TaskError {
    /// Creates an invalid entry error.
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        TaskError::InvalidEntry {
            message: message.into(),
        }
    }

    /// Creates a permanent hardware failure error.
    pub fn hardware(message: impl Into<String>) -> Self {
        TaskError::HardwareFailure {
            message: message.into(),
        }
    }

    /// Creates a retry error.
    pub fn need_retry(reason: impl Into<String>) -> Self {
        TaskError::NeedRetry {
            reason: reason.into(),
        }
    }

    /// Creates a dependency wait error.
    pub fn waiting_for(dependency: impl Into<String>) -> Self {
        TaskError::WaitingForDependency {
            dependency: dependency.into(),
        }
    }

    /// Creates a duplicate error.
    pub fn duplicated(reason: impl Into<String>) -> Self {
        TaskError::Duplicated {
            reason: reason.into(),
        }
    }

    /// Converts this error to a TaskStatus.
    pub fn to_status(&self) -> TaskStatus {
        match self {
            TaskError::InvalidEntry { .. } => TaskStatus::InvalidEntry,
            TaskError::HardwareFailure { .. } => TaskStatus::Failed,
            TaskError::NeedRetry { .. } => TaskStatus::NeedRetry,
            TaskError::WaitingForDependency { .. } => TaskStatus::WaitingForDependency,
            TaskError::Duplicated { .. } => TaskStatus::Duplicated,
        }
    }
}

/// Result type for event processing.
pub type TaskResult<T> = Result<T, TaskError>;

/// Extension trait for converting TaskResult to TaskStatus.
pub trait TaskResultExt {
    /// Converts this result to a TaskStatus.
    fn to_status(&self) -> TaskStatus;
}

impl<T> TaskResultExt for TaskResult<T> {
    fn to_status(&self) -> TaskStatus {
        match self {
            Ok(_) => TaskStatus::Success,
            Err(e) => e.to_status(),
        }
    }
}
