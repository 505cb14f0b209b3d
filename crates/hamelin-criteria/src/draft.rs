//! Raw rule input as typed by a user, before it is a complete [`Rule`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CriteriaError, Result};
use crate::rule::{Operator, Rule, RuleKind, RuleValue, Scalar};

/// A possibly-incomplete rule as filled in by a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    #[serde(default)]
    pub variable: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: String,
    /// Upper bound, only used by `between`.
    #[serde(default)]
    pub upper_value: Option<String>,
    pub kind: RuleKind,
}

impl RuleDraft {
    pub fn new(
        variable: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
        kind: RuleKind,
    ) -> Self {
        Self {
            variable: variable.into(),
            operator: operator.into(),
            value: value.into(),
            upper_value: None,
            kind,
        }
    }

    /// Set the upper bound for a `between` draft.
    pub fn with_upper(mut self, upper: impl Into<String>) -> Self {
        self.upper_value = Some(upper.into());
        self
    }

    /// Names of the required fields that are still blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.variable.trim().is_empty() {
            missing.push("variable");
        }
        if self.operator.trim().is_empty() {
            missing.push("operator");
        }
        if self.value.trim().is_empty() {
            missing.push("value");
        }
        let is_between = matches!(self.operator.parse::<Operator>(), Ok(Operator::Between));
        if is_between
            && self
                .upper_value
                .as_deref()
                .is_none_or(|upper| upper.trim().is_empty())
        {
            missing.push("upper value");
        }
        missing
    }

    /// Convert into a [`Rule`].
    ///
    /// The operator token is carried over unparsed; an unknown operator is
    /// reported when the rule is evaluated, not here.
    ///
    /// # Errors
    ///
    /// [`CriteriaError::IncompleteRule`] if a required field is blank.
    pub fn into_rule(self) -> Result<Rule> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(CriteriaError::IncompleteRule(missing.join(", ")));
        }

        let lower = Scalar::text(self.value.trim());
        let value = match self.upper_value {
            Some(upper) if !upper.trim().is_empty() => {
                RuleValue::Range(lower, Scalar::text(upper.trim()))
            }
            _ => RuleValue::Single(lower),
        };

        Ok(Rule::new(
            self.variable.trim(),
            self.operator.trim(),
            value,
            self.kind,
        ))
    }
}

/// A draft that could not become a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteRule {
    /// Position of the draft in the submitted list.
    pub index: usize,
    pub draft: RuleDraft,
    pub missing: Vec<String>,
}

/// Split drafts into complete rules and one consolidated list of the
/// incomplete ones. Incomplete drafts are ignored, never blocking.
pub fn validate_drafts(
    drafts: impl IntoIterator<Item = RuleDraft>,
) -> (Vec<Rule>, Vec<IncompleteRule>) {
    let mut rules = Vec::new();
    let mut incomplete = Vec::new();

    for (index, draft) in drafts.into_iter().enumerate() {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            debug!("Ignoring incomplete draft #{}: missing {}", index, missing.join(", "));
            incomplete.push(IncompleteRule {
                index,
                missing: missing.into_iter().map(String::from).collect(),
                draft,
            });
            continue;
        }
        if let Ok(rule) = draft.into_rule() {
            rules.push(rule);
        }
    }

    (rules, incomplete)
}
