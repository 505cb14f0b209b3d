//! Integration tests for the criteria engine.
//!
//! These tests exercise rule composition end to end on synthetic cohorts and
//! on the CSV fixtures.

use hamelin_criteria::{
    CriteriaSet, Dataset, DatasetFilterService, FilterConfig, FilterWarning, Operator, Rule,
    RuleDraft, RuleKind, apply_criteria, range, validate_drafts,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// 100 patients:
/// - rows 0..20 are minors (age 10), rows 0..10 of them responders
/// - rows 20..100 are adults, rows 20..30 responders
/// - rows 97..100 are aged 95, everyone else adult is 40
fn hundred_patients() -> Dataset {
    let ages: Vec<i64> = (0..100)
        .map(|i| match i {
            0..20 => 10,
            97..100 => 95,
            _ => 40,
        })
        .collect();
    let status: Vec<&str> = (0..100)
        .map(|i| {
            if i < 10 || (20..30).contains(&i) {
                "responder"
            } else {
                "non-responder"
            }
        })
        .collect();
    let bmi: Vec<f64> = (0..100).map(|i| 18.0 + (i % 25) as f64).collect();

    df! {
        "age" => ages,
        "status" => status,
        "bmi" => bmi,
    }
    .unwrap()
    .into()
}

fn candidate_inclusions() -> Vec<Rule> {
    vec![
        Rule::inclusion("age", Operator::GreaterOrEqual, 18),
        Rule::inclusion("status", Operator::Equals, "responder"),
        Rule::inclusion("bmi", Operator::Between, range(30, 35)),
        Rule::inclusion("status", Operator::Contains, "NON"),
        Rule::inclusion("weight", Operator::GreaterThan, 80),
    ]
}

fn candidate_exclusions() -> Vec<Rule> {
    vec![
        Rule::exclusion("age", Operator::GreaterThan, 90),
        Rule::exclusion("bmi", Operator::GreaterOrEqual, 40),
        Rule::exclusion("status", Operator::NotEquals, "responder"),
        Rule::exclusion("age", Operator::LessThan, "adult"),
        Rule::exclusion("age", Operator::LessOrEqual, 10),
    ]
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_hundred_row_scenario() {
    let dataset = hundred_patients();
    let mut criteria = CriteriaSet::from_rules([
        Rule::inclusion("age", Operator::GreaterOrEqual, 18),
        Rule::inclusion("status", Operator::Equals, "responder"),
        Rule::exclusion("age", Operator::GreaterThan, 90),
    ]);

    let outcome = criteria.apply(&dataset).unwrap();

    assert_eq!(outcome.stats.original_count, 100);
    assert_eq!(outcome.stats.filtered_count, 87);
    assert_eq!(outcome.stats.removed_count, 13);
    assert_eq!(outcome.stats.removed_percent, 13.0);
    assert_eq!(outcome.stats.inclusion_rule_count, 2);
    assert_eq!(outcome.stats.exclusion_rule_count, 1);
    assert!(outcome.skipped.is_empty());
    assert_eq!(dataset.row_count(), 100);
}

#[test]
fn test_empty_criteria_is_identity() {
    let dataset = hundred_patients();
    let outcome = CriteriaSet::new().apply(&dataset).unwrap();

    assert_eq!(outcome.stats.filtered_count, 100);
    assert_eq!(outcome.stats.removed_percent, 0.0);
    assert!(outcome.dataset.as_dataframe().equals(dataset.as_dataframe()));
}

#[test]
fn test_inclusion_only_is_monotonic_non_decreasing() {
    let dataset = hundred_patients();
    let mut criteria = CriteriaSet::new();
    let mut previous: Option<usize> = None;

    for rule in candidate_inclusions() {
        criteria.add(rule);
        let count = criteria.apply(&dataset).unwrap().stats.filtered_count;
        if let Some(prev) = previous {
            assert!(count >= prev, "{count} < {prev} after adding inclusion rule");
        }
        previous = Some(count);
    }
}

#[test]
fn test_exclusion_only_is_monotonic_non_increasing() {
    let dataset = hundred_patients();
    let mut criteria = CriteriaSet::new();
    let mut previous = dataset.row_count();

    for rule in candidate_exclusions() {
        criteria.add(rule);
        let count = criteria.apply(&dataset).unwrap().stats.filtered_count;
        assert!(count <= previous, "{count} > {previous} after adding exclusion rule");
        previous = count;
    }
}

#[test]
fn test_inclusion_monotonic_after_unknown_column_rule() {
    let dataset = hundred_patients();
    let mut criteria = CriteriaSet::new();
    criteria.add(Rule::inclusion("weight", Operator::GreaterThan, 80));
    let mut previous = criteria.apply(&dataset).unwrap().stats.filtered_count;
    assert_eq!(previous, 0);

    for rule in candidate_inclusions().into_iter().rev() {
        criteria.add(rule);
        let count = criteria.apply(&dataset).unwrap().stats.filtered_count;
        assert!(count >= previous, "{count} < {previous} after adding inclusion rule");
        previous = count;
    }
    assert_eq!(previous, 100);
}

#[test]
fn test_exclusion_monotonic_after_unknown_column_rule() {
    let dataset = hundred_patients();
    let mut criteria = CriteriaSet::new();
    criteria.add(Rule::exclusion("weight", Operator::GreaterThan, 80));
    let mut previous = criteria.apply(&dataset).unwrap().stats.filtered_count;
    assert_eq!(previous, 100);

    for rule in candidate_exclusions().into_iter().rev() {
        criteria.add(rule);
        let count = criteria.apply(&dataset).unwrap().stats.filtered_count;
        assert!(count <= previous, "{count} > {previous} after adding exclusion rule");
        previous = count;
    }
}

#[test]
fn test_inclusion_only_matches_union_of_masks() {
    let dataset = hundred_patients();
    let rules = &candidate_inclusions()[..3];

    let mut expected = vec![false; dataset.row_count()];
    for rule in rules {
        let mask = hamelin_criteria::evaluate(rule, &dataset).unwrap();
        for (acc, hit) in expected.iter_mut().zip(mask.as_slice()) {
            *acc |= *hit;
        }
    }
    let expected_count = expected.iter().filter(|&&b| b).count();

    let mut criteria = CriteriaSet::from_rules(rules.to_vec());
    assert_eq!(
        criteria.apply(&dataset).unwrap().stats.filtered_count,
        expected_count
    );
}

#[test]
fn test_stats_invariant_holds_for_every_combination() {
    let dataset = hundred_patients();
    let inclusions = candidate_inclusions();
    let exclusions = candidate_exclusions();

    for i in 0..=inclusions.len() {
        for e in 0..=exclusions.len() {
            let mut criteria = CriteriaSet::from_rules(
                inclusions[..i].iter().chain(&exclusions[..e]).cloned(),
            );
            let stats = criteria.apply(&dataset).unwrap().stats;
            assert_eq!(stats.removed_count + stats.filtered_count, stats.original_count);
            assert!((0.0..=100.0).contains(&stats.removed_percent));
        }
    }
}

#[test]
fn test_zero_row_dataset() {
    let dataset: Dataset = DataFrame::new(vec![
        Column::new("age".into(), Vec::<i64>::new()),
        Column::new("status".into(), Vec::<String>::new()),
    ])
    .unwrap()
    .into();

    let mut criteria = CriteriaSet::from_rules([
        Rule::inclusion("age", Operator::GreaterOrEqual, 18),
        Rule::exclusion("status", Operator::Contains, "non"),
    ]);
    let stats = criteria.apply(&dataset).unwrap().stats;

    assert_eq!(stats.original_count, 0);
    assert_eq!(stats.filtered_count, 0);
    assert_eq!(stats.removed_percent, 0.0);
}

#[test]
fn test_unknown_column_rule_is_skipped_not_fatal() {
    let dataset = hundred_patients();
    let mut criteria = CriteriaSet::from_rules([
        Rule::inclusion("weight", Operator::GreaterThan, 80),
        Rule::exclusion("age", Operator::GreaterThan, 90),
    ]);

    let outcome = criteria.apply(&dataset).unwrap();

    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].rule.variable, "weight");
    // the inclusion group exists but matched nothing
    assert_eq!(outcome.stats.filtered_count, 0);
    assert_eq!(outcome.stats.inclusion_rule_count, 0);
    assert_eq!(outcome.stats.skipped_rule_count, 1);
}

// ============================================================================
// Service and fixtures
// ============================================================================

#[test]
fn test_fixture_cohort_with_rules_file() {
    let dataset = Dataset::read_csv(fixtures_path().join("cohort.csv")).unwrap();
    let rules: Vec<Rule> = serde_json::from_str(
        &std::fs::read_to_string(fixtures_path().join("rules.json")).unwrap(),
    )
    .unwrap();

    let mut criteria = CriteriaSet::from_rules(rules);
    let report = apply_criteria(&dataset, &mut criteria, &FilterConfig::default()).unwrap();

    let kept: Vec<String> = report
        .dataset
        .column_values("patient_id")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .map(String::from)
        .collect();
    assert_eq!(
        kept,
        vec!["P001", "P002", "P003", "P004", "P005", "P008", "P012"]
    );
    assert_eq!(report.stats.removed_count, 5);
    assert!(report.is_small_sample());
}

#[test]
fn test_service_reports_skipped_rules_and_small_sample_together() {
    let mut service = DatasetFilterService::new(FilterConfig::builder().min_sample_size(50).build().unwrap());
    service.add_rule(Rule::inclusion("age", Operator::LessThan, 18));
    service.add_rule(Rule::new("bmi", "around", 25, RuleKind::Exclusion));

    let report = service.apply(&hundred_patients()).unwrap();

    assert_eq!(report.stats.filtered_count, 20);
    assert_eq!(report.warnings.len(), 2);
    assert!(matches!(report.warnings[0], FilterWarning::SkippedRule(_)));
    assert_eq!(
        report.warnings[1],
        FilterWarning::SmallSample {
            filtered_count: 20,
            minimum: 50
        }
    );
}

#[test]
fn test_drafts_feed_criteria() {
    let drafts = vec![
        RuleDraft::new("age", ">=", "18", RuleKind::Inclusion),
        RuleDraft::new("age", "between", "91", RuleKind::Exclusion).with_upper("120"),
        RuleDraft::new("status", "equals", "", RuleKind::Inclusion),
    ];

    let (rules, incomplete) = validate_drafts(drafts);
    assert_eq!(incomplete.len(), 1);
    assert_eq!(incomplete[0].missing, vec!["value"]);

    let mut criteria = CriteriaSet::from_rules(rules);
    let stats = criteria.apply(&hundred_patients()).unwrap().stats;
    assert_eq!(stats.filtered_count, 77);
}
