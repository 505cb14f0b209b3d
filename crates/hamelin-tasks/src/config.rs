//! Configuration types for background jobs.
//!
//! - [`TaskConfig`]: what to train (target column, time budget, problem type)
//! - [`RuntimeConfig`]: how the distributed runtime is sized, passed
//!   explicitly to the runtime instead of being read from the environment
//! - [`ShutdownConfig`]: how a cancelled training run is torn down
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hamelin_tasks::{ProblemType, TaskConfig};
//!
//! let config = TaskConfig::builder()
//!     .target_column("outcome")
//!     .time_budget(Duration::from_secs(120))
//!     .problem_type(ProblemType::Classification)
//!     .build()
//!     .expect("valid config");
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::reaper::DEFAULT_WORKER_PATTERNS;

/// Default training time budget handed to the engine.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(60);

/// Default wait between cancelling a training run and abandoning its worker.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// The type of machine learning problem to solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    /// Predicting discrete classes.
    #[default]
    Classification,
    /// Predicting continuous values.
    Regression,
}

impl ProblemType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Classification => "classification",
            ProblemType::Regression => "regression",
        }
    }
}

/// Parameters for a configuration or training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Column the model predicts. Must exist in the dataset.
    pub target_column: String,

    /// Runtime budget passed to the engine (default: 60 s).
    ///
    /// This is a parameter of the engine, not a cancellation mechanism.
    pub time_budget: Duration,

    /// Problem type; `None` lets the engine detect it.
    pub problem_type: Option<ProblemType>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            target_column: String::new(),
            time_budget: DEFAULT_TIME_BUDGET,
            problem_type: None,
        }
    }
}

impl TaskConfig {
    #[must_use]
    pub fn builder() -> TaskConfigBuilder {
        TaskConfigBuilder::default()
    }

    /// Check the constraints enforced by the builder.
    ///
    /// # Errors
    ///
    /// [`TaskError::InvalidConfig`] if the target column is blank or the time
    /// budget is zero.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.target_column.trim().is_empty() {
            return Err(TaskError::InvalidConfig(
                "target_column is required".to_string(),
            ));
        }
        if self.time_budget.is_zero() {
            return Err(TaskError::InvalidConfig(
                "time_budget must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`TaskConfig`].
#[derive(Debug, Clone, Default)]
pub struct TaskConfigBuilder {
    config: TaskConfig,
}

impl TaskConfigBuilder {
    #[must_use]
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.config.target_column = column.into();
        self
    }

    #[must_use]
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.config.time_budget = budget;
        self
    }

    #[must_use]
    pub fn problem_type(mut self, problem_type: ProblemType) -> Self {
        self.config.problem_type = Some(problem_type);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// See [`TaskConfig::validate`].
    pub fn build(self) -> Result<TaskConfig, TaskError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Sizing of the distributed-execution runtime used for training.
///
/// Handed to [`DistributedRuntime::initialize`](crate::DistributedRuntime::initialize);
/// this crate never reads or writes process environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Number of worker processes; `None` lets the runtime decide.
    pub num_workers: Option<usize>,

    /// Shared object store size in MiB; `None` lets the runtime decide.
    pub object_store_memory_mb: Option<u64>,

    /// Whether to start the runtime's web dashboard.
    pub include_dashboard: bool,

    /// Whether worker logs are forwarded to the driver.
    pub log_to_driver: bool,

    /// Extra variables for the runtime's worker processes only.
    pub env: BTreeMap<String, String>,
}

impl RuntimeConfig {
    #[must_use]
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// # Errors
    ///
    /// [`TaskError::InvalidConfig`] if a size is zero or an env key is blank.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.num_workers == Some(0) {
            return Err(TaskError::InvalidConfig(
                "num_workers must be at least 1".to_string(),
            ));
        }
        if self.object_store_memory_mb == Some(0) {
            return Err(TaskError::InvalidConfig(
                "object_store_memory_mb must be at least 1".to_string(),
            ));
        }
        if self.env.keys().any(|k| k.trim().is_empty()) {
            return Err(TaskError::InvalidConfig(
                "runtime env keys must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`RuntimeConfig`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    #[must_use]
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = Some(workers);
        self
    }

    #[must_use]
    pub fn object_store_memory_mb(mut self, mb: u64) -> Self {
        self.config.object_store_memory_mb = Some(mb);
        self
    }

    #[must_use]
    pub fn include_dashboard(mut self, include: bool) -> Self {
        self.config.include_dashboard = include;
        self
    }

    #[must_use]
    pub fn log_to_driver(mut self, enabled: bool) -> Self {
        self.config.log_to_driver = enabled;
        self
    }

    /// Add one variable for the runtime's worker processes.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.insert(key.into(), value.into());
        self
    }

    /// # Errors
    ///
    /// See [`RuntimeConfig::validate`].
    pub fn build(self) -> Result<RuntimeConfig, TaskError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Teardown behaviour for a cancelled training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// How long to wait for the worker after cancelling (default: 2 s).
    pub grace_period: Duration,

    /// Regex patterns matched against process names and command lines of
    /// runtime workers to kill on cancellation.
    pub reaper_patterns: Vec<String>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            reaper_patterns: DEFAULT_WORKER_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl ShutdownConfig {
    #[must_use]
    pub fn builder() -> ShutdownConfigBuilder {
        ShutdownConfigBuilder::default()
    }

    /// # Errors
    ///
    /// [`TaskError::InvalidConfig`] if a pattern is empty or is not a valid
    /// regular expression.
    pub fn validate(&self) -> Result<(), TaskError> {
        for pattern in &self.reaper_patterns {
            if pattern.is_empty() {
                return Err(TaskError::InvalidConfig(
                    "reaper patterns must not be empty".to_string(),
                ));
            }
            Regex::new(pattern).map_err(|e| {
                TaskError::InvalidConfig(format!("invalid reaper pattern '{pattern}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Builder for [`ShutdownConfig`].
#[derive(Debug, Clone, Default)]
pub struct ShutdownConfigBuilder {
    config: ShutdownConfig,
}

impl ShutdownConfigBuilder {
    #[must_use]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_period = grace;
        self
    }

    /// Replace the default worker patterns.
    #[must_use]
    pub fn reaper_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.reaper_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// # Errors
    ///
    /// See [`ShutdownConfig::validate`].
    pub fn build(self) -> Result<ShutdownConfig, TaskError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_config_defaults() {
        let config = TaskConfig::default();
        assert_eq!(config.time_budget, Duration::from_secs(60));
        assert!(config.problem_type.is_none());
    }

    #[test]
    fn test_task_config_builder() {
        let config = TaskConfig::builder()
            .target_column("outcome")
            .problem_type(ProblemType::Regression)
            .time_budget(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.target_column, "outcome");
        assert_eq!(config.problem_type, Some(ProblemType::Regression));
    }

    #[test]
    fn test_task_config_requires_target() {
        let err = TaskConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("target_column"));

        let err = TaskConfig::builder()
            .target_column("y")
            .time_budget(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("time_budget"));
    }

    #[test]
    fn test_runtime_config() {
        let config = RuntimeConfig::builder()
            .num_workers(4)
            .object_store_memory_mb(512)
            .env("OMP_NUM_THREADS", "1")
            .build()
            .unwrap();
        assert_eq!(config.num_workers, Some(4));
        assert!(!config.include_dashboard);
        assert_eq!(config.env.get("OMP_NUM_THREADS").map(String::as_str), Some("1"));

        assert!(RuntimeConfig::builder().num_workers(0).build().is_err());
        assert!(RuntimeConfig::builder().object_store_memory_mb(0).build().is_err());
        assert!(RuntimeConfig::builder().env(" ", "x").build().is_err());
    }

    #[test]
    fn test_shutdown_config_defaults() {
        let config = ShutdownConfig::default();
        assert_eq!(config.grace_period, Duration::from_secs(2));
        assert!(config.reaper_patterns.iter().any(|p| p == "raylet"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shutdown_config_rejects_bad_pattern() {
        let err = ShutdownConfig::builder()
            .reaper_patterns(["worker(["])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("worker(["));

        assert!(ShutdownConfig::builder().reaper_patterns([""]).build().is_err());
    }

    #[test]
    fn test_problem_type_json() {
        assert_eq!(
            serde_json::to_string(&ProblemType::Regression).unwrap(),
            "\"regression\""
        );
        assert_eq!(ProblemType::default().as_str(), "classification");
    }
}
