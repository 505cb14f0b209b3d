//! Inclusion/Exclusion Criteria Engine
//!
//! Filters tabular patient data with user-defined rules before it is handed
//! to an AutoML run.
//!
//! # Overview
//!
//! - **Rules**: a [`Rule`] compares one column against a value using one of
//!   nine operators (`==`, `!=`, `>`, `<`, `>=`, `<=`, `between`,
//!   `contains`, `not_contains`)
//! - **Evaluation**: [`RuleEvaluator`] turns a rule into a [`BooleanMask`]
//! - **Composition**: [`CriteriaSet`] keeps a row when it satisfies any
//!   inclusion rule (or there are none) and no exclusion rule
//! - **Reporting**: [`DatasetFilterService`] adds statistics and warnings
//!   (skipped rules, small samples) to every filter result
//!
//! A rule that cannot be evaluated (unknown column, unknown operator, wrong
//! types, malformed range) is skipped and reported; it never aborts the
//! filter.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hamelin_criteria::{Dataset, DatasetFilterService, FilterConfig, Operator, Rule, range};
//!
//! let dataset = Dataset::read_csv("patients.csv")?;
//!
//! let mut service = DatasetFilterService::new(FilterConfig::default());
//! service.add_rule(Rule::inclusion("age", Operator::GreaterOrEqual, 18));
//! service.add_rule(Rule::exclusion("bmi", Operator::Between, range(40, 80)));
//!
//! let report = service.apply(&dataset)?;
//! println!(
//!     "{} -> {} rows ({:.1}% removed)",
//!     report.stats.original_count, report.stats.filtered_count, report.stats.removed_percent
//! );
//! for warning in &report.warnings {
//!     println!("warning: {}", warning.message());
//! }
//! ```
//!
//! # Drafts
//!
//! Forms produce [`RuleDraft`]s whose fields may still be blank.
//! [`validate_drafts`] separates the complete ones from a single list of
//! [`IncompleteRule`]s so they can be reported together and ignored.

pub mod config;
pub mod criteria;
pub mod dataset;
pub mod draft;
pub mod error;
pub mod evaluator;
pub mod rule;
pub mod service;
pub mod types;
pub mod utils;

pub use config::{ConfigValidationError, DEFAULT_MIN_SAMPLE_SIZE, FilterConfig, FilterConfigBuilder};
pub use criteria::CriteriaSet;
pub use dataset::{BooleanMask, Dataset};
pub use draft::{IncompleteRule, RuleDraft, validate_drafts};
pub use error::{CriteriaError, Result as CriteriaResult};
pub use evaluator::{RuleEvaluator, evaluate};
pub use rule::{Operator, Rule, RuleKind, RuleValue, Scalar, range};
pub use service::{DatasetFilterService, apply_criteria};
pub use types::{FilterOutcome, FilterReport, FilterStats, FilterWarning, SkippedRule};

static_assertions::assert_impl_all!(Dataset: Send, Sync, Clone);
static_assertions::assert_impl_all!(CriteriaSet: Send, Sync);
static_assertions::assert_impl_all!(Rule: Send, Sync, Clone);
