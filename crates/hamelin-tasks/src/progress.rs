//! Progress reporting types for background tasks.
//!
//! Jobs report [`ProgressUpdate`]s through their
//! [`TaskContext`](crate::TaskContext); the task forwards them as
//! [`TaskEvent::Progress`](crate::TaskEvent::Progress) in the order the
//! worker produced them.
//!
//! # Example
//!
//! ```
//! use hamelin_tasks::{ProgressUpdate, TaskStage};
//!
//! let update = ProgressUpdate::new(TaskStage::Training, 0.3, "Training models");
//! assert_eq!(update.stage.as_str(), "training");
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The current stage of a running job.
///
/// A configuration run goes `Initializing → Configuring → Complete`; a
/// training run goes `Initializing → Training → Evaluating → RenderingCharts
/// → ConfusionMatrix → Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    /// Validating inputs and preparing the runtime.
    #[default]
    Initializing,
    /// Running automatic configuration.
    Configuring,
    /// Training inside the engine.
    Training,
    /// Computing metrics for the trained model.
    Evaluating,
    /// Rendering result charts.
    RenderingCharts,
    /// Computing the confusion matrix.
    ConfusionMatrix,
    /// The job finished every phase.
    Complete,
}

impl TaskStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStage::Initializing => "initializing",
            TaskStage::Configuring => "configuring",
            TaskStage::Training => "training",
            TaskStage::Evaluating => "evaluating",
            TaskStage::RenderingCharts => "rendering_charts",
            TaskStage::ConfusionMatrix => "confusion_matrix",
            TaskStage::Complete => "complete",
        }
    }
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a [`TaskStage`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTaskStageError {
    invalid_value: String,
}

impl ParseTaskStageError {
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseTaskStageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid task stage: '{}'. Valid values are: initializing, configuring, training, \
             evaluating, rendering_charts, confusion_matrix, complete",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParseTaskStageError {}

impl FromStr for TaskStage {
    type Err = ParseTaskStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(TaskStage::Initializing),
            "configuring" => Ok(TaskStage::Configuring),
            "training" => Ok(TaskStage::Training),
            "evaluating" => Ok(TaskStage::Evaluating),
            "rendering_charts" => Ok(TaskStage::RenderingCharts),
            "confusion_matrix" => Ok(TaskStage::ConfusionMatrix),
            "complete" => Ok(TaskStage::Complete),
            _ => Err(ParseTaskStageError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// A point in a job where cooperative cancellation is checked.
///
/// The engine call itself is opaque; cancellation is observed before or
/// after it, never during it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    /// Before automatic configuration.
    PreConfigure,
    /// Before the engine's training call.
    PreTrain,
    /// After the engine's training call returns.
    PostTrain,
    /// Before rendering charts.
    PreChartGeneration,
    /// Before computing the confusion matrix.
    PreConfusionMatrix,
}

impl Checkpoint {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Checkpoint::PreConfigure => "pre_configure",
            Checkpoint::PreTrain => "pre_train",
            Checkpoint::PostTrain => "post_train",
            Checkpoint::PreChartGeneration => "pre_chart_generation",
            Checkpoint::PreConfusionMatrix => "pre_confusion_matrix",
        }
    }

    /// The stage that begins once this checkpoint passes.
    #[must_use]
    pub fn next_stage(&self) -> TaskStage {
        match self {
            Checkpoint::PreConfigure => TaskStage::Configuring,
            Checkpoint::PreTrain => TaskStage::Training,
            Checkpoint::PostTrain => TaskStage::Evaluating,
            Checkpoint::PreChartGeneration => TaskStage::RenderingCharts,
            Checkpoint::PreConfusionMatrix => TaskStage::ConfusionMatrix,
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A progress update from a running job.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// The current stage.
    pub stage: TaskStage,

    /// Overall progress from 0.0 to 1.0.
    pub progress: f64,

    /// Human-readable status message.
    pub message: String,
}

impl ProgressUpdate {
    /// Creates an update; `progress` is clamped to `[0.0, 1.0]`.
    pub fn new(stage: TaskStage, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a completion update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(TaskStage::Complete, 1.0, message)
    }
}

/// Type alias for a progress callback function.
///
/// Called on the worker thread; should return quickly.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
