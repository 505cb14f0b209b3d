//! Narrow interfaces to the external AutoML engine and plotting library.
//!
//! The engine is treated as an opaque, non-preemptible black box: jobs call
//! it between checkpoints and only observe cancellation before or after each
//! call. Implementations report failures as an opaque [`EngineError`]
//! message.

use std::collections::BTreeMap;
use std::time::Duration;

use hamelin_criteria::Dataset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ProblemType, TaskConfig};

/// Failure reported by an engine, plotter or runtime implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result of automatic configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoConfig {
    /// Detected or confirmed problem type.
    pub problem_type: ProblemType,

    /// Suggested training time budget.
    pub time_budget: Duration,

    /// Metric the engine optimizes (e.g. "accuracy", "r2").
    pub metric: String,

    /// Algorithms the engine intends to try, best candidates first.
    pub candidate_algorithms: Vec<String>,

    /// Engine-specific settings shown to the user as-is.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

/// An opaque handle to a model trained by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Display name of the winning model.
    pub name: String,

    /// Algorithm family (e.g. "random_forest").
    pub algorithm: String,

    /// Column the model predicts.
    pub target_column: String,

    /// Input columns, in training order.
    pub feature_columns: Vec<String>,

    /// Engine-specific payload; never interpreted by this crate.
    #[serde(default)]
    pub artifact: serde_json::Value,
}

/// Evaluation metrics for a trained model.
///
/// Classification engines populate the classification fields, regression
/// engines the regression fields; `test_score` is always the headline
/// score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Cross-validation score (mean across folds).
    pub cv_score: Option<f64>,
    /// Score on the held-out test set.
    pub test_score: Option<f64>,
    /// Score on the training set.
    pub train_score: Option<f64>,

    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
    /// Binary classification only.
    pub roc_auc: Option<f64>,

    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub r2: Option<f64>,
}

/// A rendered chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    /// MIME type of `data`, e.g. `image/png` or `image/svg+xml`.
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Counts of predicted vs. actual classes. `counts[actual][predicted]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    /// Build a matrix, checking it is square and matches the labels.
    pub fn new(labels: Vec<String>, counts: Vec<Vec<u64>>) -> Result<Self, EngineError> {
        if counts.len() != labels.len() || counts.iter().any(|row| row.len() != labels.len()) {
            return Err(EngineError::new(format!(
                "confusion matrix must be {n}x{n} for {n} labels",
                n = labels.len()
            )));
        }
        Ok(Self { labels, counts })
    }

    /// Total number of predictions.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Share of predictions on the diagonal; `None` when empty.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let correct: u64 = self
            .counts
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row.get(i))
            .sum();
        Some(correct as f64 / total as f64)
    }
}

/// The AutoML engine.
///
/// Called from a worker thread, hence `Send + Sync`.
pub trait AutoMlEngine: Send + Sync {
    /// Suggest a configuration for predicting `target` from `dataset`.
    fn auto_configure(&self, dataset: &Dataset, target: &str) -> Result<AutoConfig, EngineError>;

    /// Train on `dataset` using the target column, time budget and problem
    /// type from `config`.
    fn train(&self, dataset: &Dataset, config: &TaskConfig) -> Result<TrainedModel, EngineError>;

    /// Compute metrics for `model`.
    fn evaluate(&self, model: &TrainedModel, dataset: &Dataset) -> Result<Metrics, EngineError>;
}

/// The plotting library used to render training results.
pub trait ResultPlotter: Send + Sync {
    /// Render the charts shown on the results page.
    fn render_charts(&self, model: &TrainedModel, metrics: &Metrics)
    -> Result<Vec<Chart>, EngineError>;

    /// Confusion matrix for classification models; `None` for regression.
    fn confusion_matrix(
        &self,
        model: &TrainedModel,
        dataset: &Dataset,
    ) -> Result<Option<ConfusionMatrix>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix_shape_checked() {
        let labels = vec!["yes".to_string(), "no".to_string()];
        assert!(ConfusionMatrix::new(labels.clone(), vec![vec![1, 2]]).is_err());
        assert!(ConfusionMatrix::new(labels.clone(), vec![vec![1, 2], vec![3]]).is_err());

        let matrix = ConfusionMatrix::new(labels, vec![vec![40, 10], vec![5, 45]]).unwrap();
        assert_eq!(matrix.total(), 100);
        assert_eq!(matrix.accuracy(), Some(0.85));
    }

    #[test]
    fn test_empty_confusion_matrix_has_no_accuracy() {
        let matrix = ConfusionMatrix::new(vec![], vec![]).unwrap();
        assert_eq!(matrix.accuracy(), None);
    }

    #[test]
    fn test_engine_error_display() {
        assert_eq!(EngineError::new("boom").to_string(), "boom");
    }

    #[test]
    fn test_trained_model_json_without_artifact() {
        let model: TrainedModel = serde_json::from_str(
            r#"{"name":"rf","algorithm":"random_forest","target_column":"y","feature_columns":["a"]}"#,
        )
        .unwrap();
        assert!(model.artifact.is_null());
    }
}
