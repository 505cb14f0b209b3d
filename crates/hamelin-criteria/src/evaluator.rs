//! Evaluation of a single rule against a dataset column.

use polars::prelude::*;
use tracing::trace;

use crate::dataset::{BooleanMask, Dataset};
use crate::error::{CriteriaError, Result};
use crate::rule::{Operator, Rule, RuleValue, Scalar};
use crate::utils::{is_numeric_dtype, numeric_values, string_values};

/// Evaluates rules into row selection masks.
///
/// Stateless; kept as a unit struct so callers can hold it alongside other
/// engine components.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluate `rule` against `dataset`, producing one boolean per row.
    ///
    /// # Errors
    ///
    /// - [`CriteriaError::UnknownVariable`] if the column does not exist
    /// - [`CriteriaError::InvalidOperator`] if the operator token is unknown
    /// - [`CriteriaError::TypeMismatch`] for numeric comparisons against a
    ///   non-numeric column or a non-numeric value
    /// - [`CriteriaError::MalformedRange`] if `between` lacks two numeric bounds
    pub fn evaluate(&self, rule: &Rule, dataset: &Dataset) -> Result<BooleanMask> {
        let series = dataset.column_values(&rule.variable)?;
        let operator = rule.parsed_operator()?;

        let mask = match operator {
            Operator::Equals => equals_mask(rule, series)?,
            Operator::NotEquals => equals_mask(rule, series)?.negate(),
            Operator::GreaterThan
            | Operator::LessThan
            | Operator::GreaterOrEqual
            | Operator::LessOrEqual => {
                let threshold = numeric_operand(rule)?;
                let values = numeric_column(rule, series)?;
                values
                    .into_iter()
                    .map(|cell| cell.is_some_and(|v| compare(operator, v, threshold)))
                    .collect()
            }
            Operator::Between => {
                let (min, max) = range_bounds(rule)?;
                let values = numeric_column(rule, series)?;
                values
                    .into_iter()
                    .map(|cell| cell.is_some_and(|v| min <= v && v <= max))
                    .collect()
            }
            Operator::Contains => contains_mask(rule, series)?,
            Operator::NotContains => contains_mask(rule, series)?.negate(),
        };

        trace!(
            "Rule '{}' selected {}/{} rows",
            rule,
            mask.count_true(),
            mask.len()
        );
        Ok(mask)
    }
}

/// Evaluate a rule with a default evaluator.
pub fn evaluate(rule: &Rule, dataset: &Dataset) -> Result<BooleanMask> {
    RuleEvaluator.evaluate(rule, dataset)
}

fn compare(operator: Operator, value: f64, threshold: f64) -> bool {
    match operator {
        Operator::GreaterThan => value > threshold,
        Operator::LessThan => value < threshold,
        Operator::GreaterOrEqual => value >= threshold,
        Operator::LessOrEqual => value <= threshold,
        _ => false,
    }
}

fn single_value<'a>(rule: &'a Rule) -> Result<&'a Scalar> {
    match &rule.value {
        RuleValue::Single(value) => Ok(value),
        RuleValue::Range(_, _) => Err(CriteriaError::type_mismatch(
            &rule.variable,
            format!("operator '{}' expects a single value, got a range", rule.operator),
        )),
    }
}

fn numeric_operand(rule: &Rule) -> Result<f64> {
    let value = single_value(rule)?;
    value.as_number().ok_or_else(|| {
        CriteriaError::type_mismatch(
            &rule.variable,
            format!("value '{value}' is not numeric"),
        )
    })
}

fn range_bounds(rule: &Rule) -> Result<(f64, f64)> {
    match &rule.value {
        RuleValue::Range(lo, hi) => match (lo.as_number(), hi.as_number()) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(CriteriaError::malformed_range(
                &rule.variable,
                format!("bounds '{lo}' and '{hi}' must both be numeric"),
            )),
        },
        RuleValue::Single(value) => Err(CriteriaError::malformed_range(
            &rule.variable,
            format!("expected two bounds, got single value '{value}'"),
        )),
    }
}

fn numeric_column(rule: &Rule, series: &Series) -> Result<Vec<Option<f64>>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(CriteriaError::type_mismatch(
            &rule.variable,
            format!("column has type {} but operator '{}' needs numbers", series.dtype(), rule.operator),
        ));
    }
    Ok(numeric_values(series)?)
}

fn equals_mask(rule: &Rule, series: &Series) -> Result<BooleanMask> {
    let value = single_value(rule)?;

    if is_numeric_dtype(series.dtype())
        && let Some(target) = value.as_number()
    {
        return Ok(numeric_values(series)?
            .into_iter()
            .map(|cell| cell == Some(target))
            .collect());
    }

    let target = value.to_string();
    Ok(string_values(series)?
        .into_iter()
        .map(|cell| cell.as_deref() == Some(target.as_str()))
        .collect())
}

fn contains_mask(rule: &Rule, series: &Series) -> Result<BooleanMask> {
    let needle = single_value(rule)?.to_string().to_lowercase();
    Ok(string_values(series)?
        .into_iter()
        .map(|cell| cell.unwrap_or_default().to_lowercase().contains(&needle))
        .collect())
}
