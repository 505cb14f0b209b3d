//! Composition of inclusion and exclusion rules.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::{BooleanMask, Dataset};
use crate::error::Result;
use crate::evaluator::RuleEvaluator;
use crate::rule::{Rule, RuleKind};
use crate::types::{FilterOutcome, FilterStats, SkippedRule};

/// An ordered collection of inclusion and exclusion rules.
///
/// Composition:
///
/// 1. `include` = OR of every inclusion rule; all rows if there is none.
/// 2. `exclude` = OR of every exclusion rule; no row if there is none.
/// 3. keep = `include AND NOT exclude`.
///
/// Rule order only matters for display. A rule that fails to evaluate is
/// skipped and reported; it never aborts the filter. Not internally
/// synchronized: the owner serializes access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriteriaSet {
    rules: Vec<Rule>,
    #[serde(skip)]
    last_stats: Option<FilterStats>,
    #[serde(skip)]
    evaluator: RuleEvaluator,
}

impl CriteriaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from an existing list of rules.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Append a rule.
    pub fn add(&mut self, rule: Rule) {
        debug!("Adding criterion: {}", rule);
        self.rules.push(rule);
    }

    /// Remove the rule at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<Rule> {
        (index < self.rules.len()).then(|| self.rules.remove(index))
    }

    /// Remove every rule and forget the last statistics.
    pub fn clear(&mut self) {
        self.rules.clear();
        self.last_stats = None;
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of configured rules of the given kind.
    pub fn count(&self, kind: RuleKind) -> usize {
        self.rules.iter().filter(|r| r.kind == kind).count()
    }

    /// Statistics from the most recent [`apply`](Self::apply).
    pub fn last_stats(&self) -> Option<&FilterStats> {
        self.last_stats.as_ref()
    }

    /// Compute the keep mask without materializing the filtered dataset.
    pub fn keep_mask(&self, dataset: &Dataset) -> (BooleanMask, Composition) {
        let rows = dataset.row_count();
        // an inclusion group with only skipped rules selects nothing
        let mut include = if self.count(RuleKind::Inclusion) > 0 {
            BooleanMask::none(rows)
        } else {
            BooleanMask::all(rows)
        };
        let mut exclude = BooleanMask::none(rows);
        let mut composition = Composition::default();

        for (index, rule) in self.rules.iter().enumerate() {
            let mask = match self.evaluator.evaluate(rule, dataset) {
                Ok(mask) => mask,
                Err(err) => {
                    warn!("Skipping criterion #{} ({}): {}", index, rule, err);
                    composition.skipped.push(SkippedRule {
                        index,
                        rule: rule.clone(),
                        code: err.error_code().to_string(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            match rule.kind {
                RuleKind::Inclusion => {
                    composition.inclusion_applied += 1;
                    include.or_assign(&mask);
                }
                RuleKind::Exclusion => {
                    composition.exclusion_applied += 1;
                    exclude.or_assign(&mask);
                }
            }
        }

        (include.and_not(&exclude), composition)
    }

    /// Apply the criteria to `dataset`, returning a filtered copy and stats.
    ///
    /// The source dataset is never modified.
    ///
    /// # Errors
    ///
    /// Only data-layer failures while materializing the filtered snapshot are
    /// returned; rule failures are reported in [`FilterOutcome::skipped`].
    pub fn apply(&mut self, dataset: &Dataset) -> Result<FilterOutcome> {
        let (keep, composition) = self.keep_mask(dataset);
        let filtered = dataset.filter(&keep)?;

        let stats = FilterStats::compute(
            dataset.row_count(),
            filtered.row_count(),
            composition.inclusion_applied,
            composition.exclusion_applied,
            composition.skipped.len(),
        );

        info!(
            "Criteria applied: {} -> {} rows ({:.1}% removed, {} inclusion, {} exclusion, {} skipped)",
            stats.original_count,
            stats.filtered_count,
            stats.removed_percent,
            stats.inclusion_rule_count,
            stats.exclusion_rule_count,
            stats.skipped_rule_count
        );

        self.last_stats = Some(stats.clone());
        Ok(FilterOutcome {
            dataset: filtered,
            stats,
            skipped: composition.skipped,
        })
    }
}

/// Bookkeeping from one composition pass.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub inclusion_applied: usize,
    pub exclusion_applied: usize,
    pub skipped: Vec<SkippedRule>,
}
