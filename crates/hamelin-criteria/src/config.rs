//! Configuration for dataset filtering.
//!
//! Uses the builder pattern so callers only override what they need.

use serde::{Deserialize, Serialize};

/// Default advisory minimum number of rows left after filtering.
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 10;

/// Configuration for [`DatasetFilterService`](crate::DatasetFilterService).
///
/// # Example
///
/// ```
/// use hamelin_criteria::FilterConfig;
///
/// let config = FilterConfig::builder()
///     .min_sample_size(25)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.min_sample_size, 25);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Filtered results smaller than this raise a small-sample warning.
    /// The result is still returned; nothing is blocked.
    /// Default: 10
    pub min_sample_size: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
        }
    }
}

impl FilterConfig {
    /// Create a new configuration builder.
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.min_sample_size == 0 {
            return Err(ConfigValidationError::InvalidMinSampleSize(
                self.min_sample_size,
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid minimum sample size: {0} (must be at least 1)")]
    InvalidMinSampleSize(usize),
}

/// Builder for [`FilterConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct FilterConfigBuilder {
    min_sample_size: Option<usize>,
}

impl FilterConfigBuilder {
    /// Set the advisory minimum sample size.
    pub fn min_sample_size(mut self, size: usize) -> Self {
        self.min_sample_size = Some(size);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<FilterConfig, ConfigValidationError> {
        let config = FilterConfig {
            min_sample_size: self.min_sample_size.unwrap_or(DEFAULT_MIN_SAMPLE_SIZE),
        };
        config.validate()?;
        Ok(config)
    }
}
