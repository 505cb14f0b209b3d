//! Task kinds and the task lifecycle state machine.
//!
//! ```text
//! Idle ──start──▶ Running ──▶ Finished | Failed | Cancelled
//!                    │
//!                 cancel
//!                    ▼
//!             CancelRequested ──▶ Cancelled
//! ```
//!
//! `CancelRequested` always resolves to `Cancelled`, never to `Finished`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two long-running operations a study session can launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Automatic configuration of the AutoML run.
    Configuration,
    /// Model training, evaluation and result rendering.
    Training,
}

impl TaskKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Configuration => "configuration",
            TaskKind::Training => "training",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a [`BackgroundTask`](crate::BackgroundTask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Created, not started.
    #[default]
    Idle,
    /// The job is executing on its worker thread.
    Running,
    /// Cancellation was requested while running; waiting for the worker.
    CancelRequested,
    /// The job completed every phase.
    Finished,
    /// The job failed without cancellation being requested.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl TaskState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Idle => "idle",
            TaskState::Running => "running",
            TaskState::CancelRequested => "cancel_requested",
            TaskState::Finished => "finished",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        }
    }

    /// `Finished`, `Failed` or `Cancelled`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Finished | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// `Running` or `CancelRequested`: a worker thread may still be alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, TaskState::Running | TaskState::CancelRequested)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a [`TaskState`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTaskStateError {
    invalid_value: String,
}

impl ParseTaskStateError {
    /// Returns the invalid value that caused the parse error.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseTaskStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid task state: '{}'. Valid values are: idle, running, cancel_requested, \
             finished, failed, cancelled",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTaskStateError {}

impl FromStr for TaskState {
    type Err = ParseTaskStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(TaskState::Idle),
            "running" => Ok(TaskState::Running),
            "cancel_requested" => Ok(TaskState::CancelRequested),
            "finished" => Ok(TaskState::Finished),
            "failed" => Ok(TaskState::Failed),
            "cancelled" => Ok(TaskState::Cancelled),
            _ => Err(ParseTaskStateError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// How [`BackgroundTask::cancel_and_wait`](crate::BackgroundTask::cancel_and_wait)
/// ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// The task reached a terminal state within the grace period (or was
    /// never running).
    Graceful,
    /// The grace period expired and the worker thread was abandoned.
    Forced,
}
