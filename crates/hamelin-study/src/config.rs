//! Session configuration.
//!
//! Bundles the filter, runtime and shutdown settings a session hands to the
//! lower crates, plus session-level limits.

use std::time::Duration;

use hamelin_criteria::FilterConfig;
use hamelin_tasks::{DEFAULT_TIME_BUDGET, PatternReaper, RuntimeConfig, ShutdownConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};

/// Maximum number of training history entries kept per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Configuration for a [`StudySession`](crate::StudySession).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hamelin_study::StudyConfig;
///
/// let config = StudyConfig::builder()
///     .min_sample_size(30)
///     .grace_period(Duration::from_secs(5))
///     .build()
///     .expect("valid config");
/// assert_eq!(config.history_limit, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Small-sample threshold for criteria filtering.
    pub filter: FilterConfig,

    /// Teardown of cancelled training runs.
    pub shutdown: ShutdownConfig,

    /// Sizing of the distributed runtime used for training.
    pub runtime: RuntimeConfig,

    /// Training time budget used when auto-configuration did not suggest one.
    pub time_budget: Duration,

    /// Training history entries kept, newest first (default: 10).
    pub history_limit: usize,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            shutdown: ShutdownConfig::default(),
            runtime: RuntimeConfig::default(),
            time_budget: DEFAULT_TIME_BUDGET,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl StudyConfig {
    #[must_use]
    pub fn builder() -> StudyConfigBuilder {
        StudyConfigBuilder::default()
    }

    /// # Errors
    ///
    /// [`StudyError::InvalidConfig`] if any nested config is invalid, the
    /// time budget is zero or the history limit is zero.
    pub fn validate(&self) -> Result<()> {
        self.filter
            .validate()
            .map_err(|e| StudyError::InvalidConfig(e.to_string()))?;
        self.shutdown
            .validate()
            .map_err(|e| StudyError::InvalidConfig(e.to_string()))?;
        self.runtime
            .validate()
            .map_err(|e| StudyError::InvalidConfig(e.to_string()))?;
        if self.time_budget.is_zero() {
            return Err(StudyError::InvalidConfig(
                "time_budget must be greater than zero".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(StudyError::InvalidConfig(
                "history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// A process reaper for the configured worker patterns.
    ///
    /// # Errors
    ///
    /// [`StudyError::InvalidConfig`] if a pattern does not compile.
    pub fn reaper(&self) -> Result<PatternReaper> {
        PatternReaper::new(&self.shutdown.reaper_patterns)
            .map_err(|e| StudyError::InvalidConfig(format!("invalid reaper pattern: {e}")))
    }
}

/// Builder for [`StudyConfig`].
#[derive(Debug, Clone, Default)]
pub struct StudyConfigBuilder {
    config: StudyConfig,
}

impl StudyConfigBuilder {
    #[must_use]
    pub fn min_sample_size(mut self, size: usize) -> Self {
        self.config.filter.min_sample_size = size;
        self
    }

    #[must_use]
    pub fn shutdown(mut self, shutdown: ShutdownConfig) -> Self {
        self.config.shutdown = shutdown;
        self
    }

    #[must_use]
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.shutdown.grace_period = grace;
        self
    }

    #[must_use]
    pub fn runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.config.runtime = runtime;
        self
    }

    #[must_use]
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.config.time_budget = budget;
        self
    }

    #[must_use]
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    /// # Errors
    ///
    /// See [`StudyConfig::validate`].
    pub fn build(self) -> Result<StudyConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
