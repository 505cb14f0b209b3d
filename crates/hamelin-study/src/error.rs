//! Error types for study sessions.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use hamelin_criteria::CriteriaError;
use hamelin_tasks::{TaskError, TaskKind};

use crate::state::WizardTab;

/// Errors returned by [`StudySession`](crate::StudySession) operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StudyError {
    /// No dataset has been loaded yet.
    #[error("No dataset loaded")]
    NoDataset,

    /// Input and target variables have not been selected yet.
    #[error("No variables selected")]
    NoSelection,

    /// A selected column is not in the dataset.
    #[error("Column '{0}' not found in dataset")]
    UnknownColumn(String),

    /// The variable selection is not usable.
    #[error("Invalid variable selection: {0}")]
    InvalidSelection(String),

    /// The wizard cannot move from `from` in the requested direction.
    #[error("Cannot leave the {from} tab: {reason}")]
    InvalidTransition { from: WizardTab, reason: String },

    /// A background task is running and blocks the operation.
    #[error("A {0} task is running")]
    TaskActive(TaskKind),

    /// Invalid session configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Background task failure.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Criteria or dataset failure.
    #[error(transparent)]
    Criteria(#[from] CriteriaError),
}

impl StudyError {
    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoDataset => "NO_DATASET",
            Self::NoSelection => "NO_SELECTION",
            Self::UnknownColumn(_) => "UNKNOWN_COLUMN",
            Self::InvalidSelection(_) => "INVALID_SELECTION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::TaskActive(_) => "TASK_ACTIVE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Task(err) => err.error_code(),
            Self::Criteria(err) => err.error_code(),
        }
    }
}

impl Serialize for StudyError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("StudyError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for study session operations.
pub type Result<T> = std::result::Result<T, StudyError>;
