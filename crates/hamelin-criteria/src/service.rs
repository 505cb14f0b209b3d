//! Dataset filtering service.
//!
//! Wraps a [`CriteriaSet`] with the advisory small-sample check and keeps the
//! most recent [`FilterReport`] so the caller can discard or reuse it.

use tracing::{info, warn};

use crate::config::FilterConfig;
use crate::criteria::CriteriaSet;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::rule::Rule;
use crate::types::{FilterOutcome, FilterReport, FilterWarning};

/// Owns the active criteria and the last filter result.
#[derive(Debug, Clone, Default)]
pub struct DatasetFilterService {
    config: FilterConfig,
    criteria: CriteriaSet,
    last_report: Option<FilterReport>,
}

impl DatasetFilterService {
    /// Create a service with the given config.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            criteria: CriteriaSet::new(),
            last_report: None,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.criteria.add(rule);
    }

    /// Remove the rule at `index`, if any.
    pub fn remove_rule(&mut self, index: usize) -> Option<Rule> {
        self.criteria.remove(index)
    }

    /// Remove every rule and discard the last report.
    pub fn clear(&mut self) {
        self.criteria.clear();
        self.last_report = None;
    }

    pub fn criteria(&self) -> &CriteriaSet {
        &self.criteria
    }

    /// Apply the active criteria to `dataset` and keep the report.
    ///
    /// A previous report is replaced. The source dataset is not modified.
    pub fn apply(&mut self, dataset: &Dataset) -> Result<&FilterReport> {
        let outcome = self.criteria.apply(dataset)?;
        let report = build_report(outcome, &self.config);
        Ok(self.last_report.insert(report))
    }

    pub fn last_report(&self) -> Option<&FilterReport> {
        self.last_report.as_ref()
    }

    /// Drop the last report. The next apply starts from the caller's
    /// original dataset again.
    pub fn discard(&mut self) -> Option<FilterReport> {
        self.last_report.take()
    }
}

/// Apply `criteria` to `dataset` without keeping any state around.
pub fn apply_criteria(
    dataset: &Dataset,
    criteria: &mut CriteriaSet,
    config: &FilterConfig,
) -> Result<FilterReport> {
    let outcome = criteria.apply(dataset)?;
    Ok(build_report(outcome, config))
}

fn build_report(outcome: FilterOutcome, config: &FilterConfig) -> FilterReport {
    let FilterOutcome {
        dataset,
        stats,
        skipped,
    } = outcome;

    let mut warnings: Vec<FilterWarning> =
        skipped.into_iter().map(FilterWarning::SkippedRule).collect();

    if stats.filtered_count < config.min_sample_size {
        warn!(
            "Small sample after filtering: {} rows (minimum {})",
            stats.filtered_count, config.min_sample_size
        );
        warnings.push(FilterWarning::SmallSample {
            filtered_count: stats.filtered_count,
            minimum: config.min_sample_size,
        });
    }

    info!(
        "Filter report: {} of {} rows kept, {} warning(s)",
        stats.filtered_count,
        stats.original_count,
        warnings.len()
    );

    FilterReport {
        dataset,
        stats,
        warnings,
    }
}
