//! Error types for the criteria engine.
//!
//! Rule-level failures (`UnknownVariable`, `InvalidOperator`, `TypeMismatch`,
//! `MalformedRange`, `IncompleteRule`) are recoverable: the criteria set skips
//! the offending rule and reports it as a warning. The remaining variants wrap
//! failures from the data layer and are propagated to the caller.
//!
//! Errors are serializable so a presentation layer can display them as
//! `{ code, message }` pairs.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for criteria evaluation and filtering.
#[derive(Error, Debug)]
pub enum CriteriaError {
    /// The rule references a column that does not exist in the dataset.
    #[error("Variable '{0}' not found in dataset")]
    UnknownVariable(String),

    /// The rule's operator token is not recognised.
    #[error("Unknown operator '{0}'")]
    InvalidOperator(String),

    /// The column or the value is not of the type the operator requires.
    #[error("Type mismatch for '{variable}': {reason}")]
    TypeMismatch { variable: String, reason: String },

    /// A `between` rule did not receive exactly two numeric bounds.
    #[error("Malformed range for '{variable}': {reason}")]
    MalformedRange { variable: String, reason: String },

    /// A rule draft is missing one of its required fields.
    #[error("Incomplete rule: missing {0}")]
    IncompleteRule(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CriteriaError {
    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownVariable(_) => "UNKNOWN_VARIABLE",
            Self::InvalidOperator(_) => "INVALID_OPERATOR",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::MalformedRange { .. } => "MALFORMED_RANGE",
            Self::IncompleteRule(_) => "INCOMPLETE_RULE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Check if this error only concerns a single rule.
    ///
    /// Rule-level errors never abort a filter operation; the rule is skipped.
    pub fn is_rule_level(&self) -> bool {
        matches!(
            self,
            Self::UnknownVariable(_)
                | Self::InvalidOperator(_)
                | Self::TypeMismatch { .. }
                | Self::MalformedRange { .. }
                | Self::IncompleteRule(_)
        )
    }

    pub(crate) fn type_mismatch(variable: &str, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_range(variable: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRange {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }
}

impl Serialize for CriteriaError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CriteriaError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for criteria operations.
pub type Result<T> = std::result::Result<T, CriteriaError>;
