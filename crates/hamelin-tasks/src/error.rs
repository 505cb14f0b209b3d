//! Error types for the hamelin-tasks crate.
//!
//! [`TaskError`] is returned by task control operations and by jobs running
//! on a worker thread. When a job fails, the worker reports the error's
//! message through [`TaskEvent::Error`](crate::TaskEvent::Error) unless
//! cancellation was requested, in which case the run settles as cancelled.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::engine::EngineError;
use crate::state::{TaskKind, TaskState};

/// The main error type for background task operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TaskError {
    /// A checkpoint observed the cancellation flag.
    ///
    /// Not an error condition for the user; the run settles as cancelled.
    #[error("Task cancelled")]
    Cancelled,

    /// The requested operation is not valid in the task's current state.
    #[error("Cannot {action} a {kind} task in state '{state}'")]
    InvalidState {
        kind: TaskKind,
        action: &'static str,
        state: TaskState,
    },

    /// A task of the same kind is already running or being cancelled.
    #[error("A {0} task is already running")]
    AlreadyRunning(TaskKind),

    /// Invalid configuration provided to a job.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured target column is not in the dataset.
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    /// The AutoML engine, plotter or runtime reported a failure.
    #[error("Engine error: {0}")]
    Engine(String),

    /// The job panicked on its worker thread.
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// Failed to spawn the worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Criteria or dataset failure.
    #[error(transparent)]
    Criteria(#[from] hamelin_criteria::CriteriaError),
}

impl TaskError {
    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "TASK_CANCELLED",
            Self::InvalidState { .. } => "TASK_INVALID_STATE",
            Self::AlreadyRunning(_) => "TASK_ALREADY_RUNNING",
            Self::InvalidConfig(_) => "TASK_INVALID_CONFIG",
            Self::TargetNotFound(_) => "TASK_TARGET_NOT_FOUND",
            Self::Engine(_) => "TASK_ENGINE_ERROR",
            Self::WorkerPanicked(_) => "TASK_WORKER_PANICKED",
            Self::Spawn(_) => "TASK_SPAWN_FAILED",
            Self::Criteria(err) => err.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<EngineError> for TaskError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err.0)
    }
}

impl Serialize for TaskError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TaskError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;
