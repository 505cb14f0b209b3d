//! Result types produced by criteria filtering.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::rule::Rule;

/// Counts describing the effect of applying a criteria set.
///
/// Recomputed on every apply. `removed_count + filtered_count` always equals
/// `original_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    pub original_count: usize,
    pub filtered_count: usize,
    pub removed_count: usize,
    /// Share of rows removed, 0-100. Zero when the dataset is empty.
    pub removed_percent: f64,
    /// Inclusion rules that were applied.
    pub inclusion_rule_count: usize,
    /// Exclusion rules that were applied.
    pub exclusion_rule_count: usize,
    /// Rules skipped because they failed to evaluate.
    pub skipped_rule_count: usize,
}

impl FilterStats {
    pub fn compute(
        original_count: usize,
        filtered_count: usize,
        inclusion_rule_count: usize,
        exclusion_rule_count: usize,
        skipped_rule_count: usize,
    ) -> Self {
        let removed_count = original_count.saturating_sub(filtered_count);
        let removed_percent = if original_count == 0 {
            0.0
        } else {
            removed_count as f64 / original_count as f64 * 100.0
        };
        Self {
            original_count,
            filtered_count,
            removed_count,
            removed_percent,
            inclusion_rule_count,
            exclusion_rule_count,
            skipped_rule_count,
        }
    }
}

/// A rule that could not be evaluated and was left out of the composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRule {
    /// Position of the rule in its criteria set.
    pub index: usize,
    pub rule: Rule,
    /// Error code of the evaluation failure (e.g. `UNKNOWN_VARIABLE`).
    pub code: String,
    pub reason: String,
}

/// Non-fatal conditions the caller should surface to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterWarning {
    /// A rule was skipped.
    SkippedRule(SkippedRule),
    /// Fewer rows than the advisory minimum remain.
    SmallSample {
        filtered_count: usize,
        minimum: usize,
    },
}

impl FilterWarning {
    /// Human readable message.
    pub fn message(&self) -> String {
        match self {
            FilterWarning::SkippedRule(skipped) => {
                format!("Rule '{}' was skipped: {}", skipped.rule, skipped.reason)
            }
            FilterWarning::SmallSample {
                filtered_count,
                minimum,
            } => format!(
                "Only {filtered_count} instances remain after filtering (recommended minimum is {minimum})"
            ),
        }
    }
}

/// Output of [`CriteriaSet::apply`](crate::CriteriaSet::apply).
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub dataset: Dataset,
    pub stats: FilterStats,
    pub skipped: Vec<SkippedRule>,
}

/// Output of [`DatasetFilterService`](crate::DatasetFilterService): the
/// filtered snapshot, its statistics and every warning raised on the way.
#[derive(Debug, Clone)]
pub struct FilterReport {
    pub dataset: Dataset,
    pub stats: FilterStats,
    pub warnings: Vec<FilterWarning>,
}

impl FilterReport {
    /// Whether the small-sample warning was raised.
    pub fn is_small_sample(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, FilterWarning::SmallSample { .. }))
    }

    /// The skipped rules, in rule order.
    pub fn skipped_rules(&self) -> impl Iterator<Item = &SkippedRule> {
        self.warnings.iter().filter_map(|w| match w {
            FilterWarning::SkippedRule(skipped) => Some(skipped),
            _ => None,
        })
    }
}
