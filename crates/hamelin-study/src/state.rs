//! Session state types.
//!
//! Everything here is serializable so a UI layer can render it directly.
//!
//! ```text
//! ┌──────┐   ┌───────────┐   ┌──────────┐   ┌───────────────┐   ┌──────────┐   ┌─────────┐
//! │ Data │──►│ Variables │──►│ Criteria │──►│ Configuration │──►│ Training │──►│ Results │
//! └──────┘   └───────────┘   └──────────┘   └───────────────┘   └──────────┘   └─────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use hamelin_criteria::Dataset;
use hamelin_tasks::{ProblemType, TrainingReport};
use serde::{Deserialize, Serialize};

// ============================================================================
// STUDY TYPE
// ============================================================================

/// The kind of study a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyType {
    Registry,
    Observational,
    ClinicalTrial,
}

impl StudyType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyType::Registry => "registry",
            StudyType::Observational => "observational",
            StudyType::ClinicalTrial => "clinical_trial",
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            StudyType::Registry => "Registry Study",
            StudyType::Observational => "Observational Study",
            StudyType::ClinicalTrial => "Clinical Trial",
        }
    }
}

impl fmt::Display for StudyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid [`StudyType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid study type: '{invalid_value}'")]
pub struct ParseStudyTypeError {
    invalid_value: String,
}

impl ParseStudyTypeError {
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl FromStr for StudyType {
    type Err = ParseStudyTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "registry" => Ok(StudyType::Registry),
            "observational" => Ok(StudyType::Observational),
            "clinical_trial" | "clinical-trial" => Ok(StudyType::ClinicalTrial),
            _ => Err(ParseStudyTypeError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// WIZARD
// ============================================================================

/// Tabs of the study wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardTab {
    #[default]
    Data,
    Variables,
    Criteria,
    Configuration,
    Training,
    Results,
}

impl WizardTab {
    pub const ALL: [WizardTab; 6] = [
        WizardTab::Data,
        WizardTab::Variables,
        WizardTab::Criteria,
        WizardTab::Configuration,
        WizardTab::Training,
        WizardTab::Results,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardTab::Data => "data",
            WizardTab::Variables => "variables",
            WizardTab::Criteria => "criteria",
            WizardTab::Configuration => "configuration",
            WizardTab::Training => "training",
            WizardTab::Results => "results",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// The following tab, `None` on the last one.
    pub fn next(self) -> Option<WizardTab> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The preceding tab, `None` on the first one.
    pub fn previous(self) -> Option<WizardTab> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl fmt::Display for WizardTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DATASET METADATA
// ============================================================================

/// Information about a single dataset column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Polars data type as string ("i64", "f64", "str").
    pub dtype: String,
    pub null_count: usize,
}

/// Metadata about the loaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Where the data came from (a file path), if known.
    pub source: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnInfo>,
}

impl DatasetInfo {
    pub fn from_dataset(dataset: &Dataset, source: Option<String>) -> Self {
        let df = dataset.as_dataframe();
        let columns: Vec<ColumnInfo> = df
            .get_columns()
            .iter()
            .map(|column| ColumnInfo {
                name: column.name().to_string(),
                dtype: column.dtype().to_string(),
                null_count: column.null_count(),
            })
            .collect();

        Self {
            source,
            row_count: df.height(),
            column_count: columns.len(),
            columns,
        }
    }
}

/// Input and target variables chosen on the variables tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSelection {
    /// Predictor columns, in selection order.
    pub inputs: Vec<String>,
    /// Column to predict.
    pub target: String,
}

impl VariableSelection {
    /// Inputs followed by the target: the columns of the training input.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.inputs.clone();
        columns.push(self.target.clone());
        columns
    }
}

// ============================================================================
// TRAINING HISTORY
// ============================================================================

/// Settings a training run was started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub target: String,
    pub inputs: Vec<String>,
    pub problem_type: Option<ProblemType>,
    pub time_budget_secs: u64,
    /// Criteria rules active when the run started.
    pub rule_count: usize,
    /// Rows in the training input.
    pub row_count: usize,
}

/// Headline numbers of a finished training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub model_name: String,
    pub algorithm: String,
    pub test_score: Option<f64>,
    pub chart_count: usize,
    pub duration_secs: f64,
}

impl From<&TrainingReport> for TrainingSummary {
    fn from(report: &TrainingReport) -> Self {
        Self {
            model_name: report.model.name.clone(),
            algorithm: report.model.algorithm.clone(),
            test_score: report.metrics.test_score,
            chart_count: report.charts.len(),
            duration_secs: report.duration.as_secs_f64(),
        }
    }
}

/// An entry in the training history.
///
/// Session-only; at most [`StudyConfig::history_limit`](crate::StudyConfig)
/// entries are kept, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistoryEntry {
    pub id: String,
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    pub study_type: StudyType,
    pub config: TrainingSnapshot,
    pub summary: TrainingSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_tab_order() {
        assert_eq!(WizardTab::Data.next(), Some(WizardTab::Variables));
        assert_eq!(WizardTab::Training.next(), Some(WizardTab::Results));
        assert_eq!(WizardTab::Results.next(), None);
        assert_eq!(WizardTab::Data.previous(), None);
        assert_eq!(WizardTab::Criteria.previous(), Some(WizardTab::Variables));
        assert!(WizardTab::Configuration < WizardTab::Training);
    }

    #[test]
    fn test_study_type_parse() {
        assert_eq!("Registry".parse::<StudyType>().unwrap(), StudyType::Registry);
        assert_eq!(
            "clinical-trial".parse::<StudyType>().unwrap(),
            StudyType::ClinicalTrial
        );
        let err = "cohort".parse::<StudyType>().unwrap_err();
        assert_eq!(err.invalid_value(), "cohort");
        assert_eq!(StudyType::ClinicalTrial.label(), "Clinical Trial");
    }

    #[test]
    fn test_dataset_info() {
        let dataset = Dataset::new(
            df!(
                "age" => &[Some(30i64), None, Some(50)],
                "sex" => &["f", "m", "f"],
            )
            .unwrap(),
        );
        let info = DatasetInfo::from_dataset(&dataset, Some("cohort.csv".to_string()));
        assert_eq!(info.row_count, 3);
        assert_eq!(info.column_count, 2);
        assert_eq!(info.columns[0].name, "age");
        assert_eq!(info.columns[0].null_count, 1);
        assert_eq!(info.columns[1].null_count, 0);
    }

    #[test]
    fn test_selection_columns() {
        let selection = VariableSelection {
            inputs: vec!["age".to_string(), "bmi".to_string()],
            target: "outcome".to_string(),
        };
        assert_eq!(selection.columns(), vec!["age", "bmi", "outcome"]);
    }
}
