//! Rule value types.
//!
//! A [`Rule`] is a plain serializable value built by the presentation layer
//! and handed to a [`CriteriaSet`](crate::CriteriaSet). It carries no
//! reference to any UI widget.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CriteriaError;
use crate::utils::{format_number, parse_numeric_string};

/// A single comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric interpretation of this value, parsing text if needed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            Scalar::Number(_) => None,
            Scalar::Text(s) => parse_numeric_string(s),
        }
    }

    /// Build a scalar from user input: numbers stay text until a numeric
    /// comparison asks for them, so `"007"` still matches a text cell exactly.
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => f.write_str(&format_number(*n)),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value as f64)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Number(f64::from(value))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// The value side of a rule: a scalar, or a `(min, max)` pair for `between`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Single(Scalar),
    Range(Scalar, Scalar),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Single(v) => write!(f, "{v}"),
            RuleValue::Range(lo, hi) => write!(f, "[{lo}, {hi}]"),
        }
    }
}

impl From<Scalar> for RuleValue {
    fn from(value: Scalar) -> Self {
        RuleValue::Single(value)
    }
}

macro_rules! single_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for RuleValue {
                fn from(value: $ty) -> Self {
                    RuleValue::Single(Scalar::from(value))
                }
            }
        )*
    };
}

single_value_from!(f64, i64, i32, &str, String);

/// Comparison operators supported by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    Contains,
    NotContains,
}

impl Operator {
    /// Canonical token for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
            Operator::Between => "between",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
        }
    }

    /// Whether the operator compares numbers and so needs a numeric column.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Operator::GreaterThan
                | Operator::LessThan
                | Operator::GreaterOrEqual
                | Operator::LessOrEqual
                | Operator::Between
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        let op = match token.as_str() {
            "==" | "=" | "equals" | "eq" => Operator::Equals,
            "!=" | "<>" | "not_equals" | "ne" => Operator::NotEquals,
            ">" | "greater_than" | "gt" => Operator::GreaterThan,
            "<" | "less_than" | "lt" => Operator::LessThan,
            ">=" | "greater_or_equal" | "ge" => Operator::GreaterOrEqual,
            "<=" | "less_or_equal" | "le" => Operator::LessOrEqual,
            "between" => Operator::Between,
            "contains" => Operator::Contains,
            "not_contains" | "not contains" => Operator::NotContains,
            _ => return Err(CriteriaError::InvalidOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Whether a rule selects rows to keep or rows to remove.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Satisfying any inclusion rule makes a row eligible.
    #[default]
    Inclusion,
    /// Satisfying any exclusion rule removes a row, overriding inclusion.
    Exclusion,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Inclusion => "inclusion",
            RuleKind::Exclusion => "exclusion",
        }
    }
}

/// One inclusion or exclusion criterion.
///
/// The operator is kept as the token the caller supplied and parsed at
/// evaluation time, so a rule with an unknown operator is skipped with a
/// warning instead of failing to construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub variable: String,
    pub operator: String,
    pub value: RuleValue,
    pub kind: RuleKind,
}

impl Rule {
    /// Create a rule from raw parts.
    pub fn new(
        variable: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<RuleValue>,
        kind: RuleKind,
    ) -> Self {
        Self {
            variable: variable.into(),
            operator: operator.into(),
            value: value.into(),
            kind,
        }
    }

    /// Create an inclusion rule.
    pub fn inclusion(
        variable: impl Into<String>,
        operator: Operator,
        value: impl Into<RuleValue>,
    ) -> Self {
        Self::new(variable, operator.as_str(), value, RuleKind::Inclusion)
    }

    /// Create an exclusion rule.
    pub fn exclusion(
        variable: impl Into<String>,
        operator: Operator,
        value: impl Into<RuleValue>,
    ) -> Self {
        Self::new(variable, operator.as_str(), value, RuleKind::Exclusion)
    }

    /// Parse the operator token.
    pub fn parsed_operator(&self) -> Result<Operator, CriteriaError> {
        self.operator.parse()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.kind.as_str(),
            self.variable,
            self.operator,
            self.value
        )
    }
}

/// Convenience for building `between` values.
pub fn range(min: impl Into<Scalar>, max: impl Into<Scalar>) -> RuleValue {
    RuleValue::Range(min.into(), max.into())
}
