//! # Identity Selectors
//!
//! A selector scopes which identities a trigger applies to, independent of
//! the trigger's type-specific condition. It may carry a match expression, a
//! selector rule, or both; every configured part must match. A selector
//! with neither matches every identity.

use std::sync::Arc;

use idtrig_core::IdentitySnapshot;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{RuleExecutor, RuleParams, SelectorEvaluator};
use crate::definition::RuleRef;
use crate::error::RuleExecutionError;

/// Scope definition attached to a trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySelector {
    /// Free-text summary shown to administrators.
    #[serde(default)]
    pub summary: Option<String>,
    /// Attribute match expression.
    #[serde(default)]
    pub match_expression: Option<MatchExpression>,
    /// Rule returning a truthy value for selected identities.
    #[serde(default)]
    pub rule: Option<RuleRef>,
}

impl IdentitySelector {
    /// Selector driven by a match expression.
    pub fn expression(expression: MatchExpression) -> Self {
        Self {
            match_expression: Some(expression),
            ..Self::default()
        }
    }

    /// Selector driven by a rule.
    pub fn rule(rule: impl Into<String>) -> Self {
        Self {
            rule: Some(RuleRef::new(rule)),
            ..Self::default()
        }
    }

    /// Whether nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.match_expression.is_none() && self.rule.is_none()
    }
}

/// Terms combined with AND or OR. OR unless `and` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchExpression {
    /// Attribute terms.
    #[serde(default)]
    pub terms: Vec<MatchTerm>,
    /// Require every term instead of any.
    #[serde(default)]
    pub and: bool,
}

impl MatchExpression {
    /// Expression matching if any term matches.
    pub fn any(terms: Vec<MatchTerm>) -> Self {
        Self { terms, and: false }
    }

    /// Expression matching if every term matches.
    pub fn all(terms: Vec<MatchTerm>) -> Self {
        Self { terms, and: true }
    }

    /// Evaluate against an identity. An expression without terms matches.
    pub fn is_match(&self, identity: &IdentitySnapshot) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        if self.and {
            self.terms.iter().all(|t| t.is_match(identity))
        } else {
            self.terms.iter().any(|t| t.is_match(identity))
        }
    }
}

/// Single `name = value` term. A term without a value selects identities
/// where the attribute is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTerm {
    /// Attribute name.
    pub name: String,
    /// Expected value.
    #[serde(default)]
    pub value: Option<String>,
}

impl MatchTerm {
    /// Term requiring `name` to equal (or contain) `value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Multi-valued attributes match when any element equals the value.
    pub fn is_match(&self, identity: &IdentitySnapshot) -> bool {
        match (identity.attribute(&self.name), self.value.as_deref()) {
            (None, None) => true,
            (Some(actual), Some(expected)) => actual.contains_text(expected),
            _ => false,
        }
    }
}

/// Default [`SelectorEvaluator`]: evaluates match expressions in place and
/// runs selector rules through an optional [`RuleExecutor`].
#[derive(Clone, Default)]
pub struct MatchExpressionEvaluator {
    rules: Option<Arc<dyn RuleExecutor>>,
}

impl MatchExpressionEvaluator {
    /// Evaluator without rule support.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator that runs selector rules through `rules`.
    pub fn with_rules(rules: Arc<dyn RuleExecutor>) -> Self {
        Self { rules: Some(rules) }
    }
}

impl SelectorEvaluator for MatchExpressionEvaluator {
    fn is_match(
        &self,
        selector: &IdentitySelector,
        identity: &IdentitySnapshot,
    ) -> Result<bool, RuleExecutionError> {
        if let Some(expression) = &selector.match_expression {
            if !expression.is_match(identity) {
                debug!(identity = %identity.name, "match expression rejected identity");
                return Ok(false);
            }
        }

        let Some(rule) = &selector.rule else {
            return Ok(true);
        };
        let Some(rules) = &self.rules else {
            return Err(RuleExecutionError::SelectorFailed {
                reason: format!("selector rule \"{rule}\" configured but no rule executor available"),
            });
        };
        let params = RuleParams {
            previous: None,
            new: Some(identity),
            trigger: None,
        };
        let result = rules
            .run_rule(rule, &params)
            .map_err(|e| RuleExecutionError::SelectorFailed {
                reason: e.to_string(),
            })?;
        Ok(result.is_some_and(|v| v.is_truthy()))
    }
}

impl std::fmt::Debug for MatchExpressionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchExpressionEvaluator")
            .field("rules", &self.rules.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idtrig_core::{AttributeValue, IdentityName};

    fn identity() -> IdentitySnapshot {
        IdentitySnapshot::new(IdentityName::new("jdoe").unwrap())
            .with_attribute("department", "Finance")
            .with_attribute("location", "Austin")
            .with_attribute(
                "groups",
                AttributeValue::List(vec!["admins".into(), "auditors".into()]),
            )
    }

    struct Fixed(Option<AttributeValue>);

    impl RuleExecutor for Fixed {
        fn run_rule(
            &self,
            _rule: &RuleRef,
            params: &RuleParams<'_>,
        ) -> Result<Option<AttributeValue>, RuleExecutionError> {
            assert!(params.previous.is_none());
            assert!(params.new.is_some());
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl RuleExecutor for Broken {
        fn run_rule(
            &self,
            rule: &RuleRef,
            _params: &RuleParams<'_>,
        ) -> Result<Option<AttributeValue>, RuleExecutionError> {
            Err(RuleExecutionError::Failed {
                rule: rule.name.clone(),
                reason: "boom".into(),
            })
        }
    }

    #[test]
    fn empty_selector_matches() {
        let eval = MatchExpressionEvaluator::new();
        assert!(IdentitySelector::default().is_empty());
        assert!(eval.is_match(&IdentitySelector::default(), &identity()).unwrap());
        let empty_expr = IdentitySelector::expression(MatchExpression::default());
        assert!(eval.is_match(&empty_expr, &identity()).unwrap());
    }

    #[test]
    fn or_is_the_default_combination() {
        let expr = MatchExpression::any(vec![
            MatchTerm::new("department", "Sales"),
            MatchTerm::new("location", "Austin"),
        ]);
        assert!(expr.is_match(&identity()));
        let yaml: MatchExpression = serde_json::from_str(
            r#"{"terms": [{"name": "department", "value": "Sales"},
                          {"name": "location", "value": "Austin"}]}"#,
        )
        .unwrap();
        assert_eq!(yaml, expr);
    }

    #[test]
    fn and_requires_every_term() {
        let expr = MatchExpression::all(vec![
            MatchTerm::new("department", "Finance"),
            MatchTerm::new("location", "Boston"),
        ]);
        assert!(!expr.is_match(&identity()));
    }

    #[test]
    fn multi_valued_attribute_matches_any_element() {
        assert!(MatchTerm::new("groups", "auditors").is_match(&identity()));
        assert!(!MatchTerm::new("groups", "ops").is_match(&identity()));
    }

    #[test]
    fn valueless_term_selects_unset_attribute() {
        let term = MatchTerm {
            name: "terminated".into(),
            value: None,
        };
        assert!(term.is_match(&identity()));
        let set = MatchTerm {
            name: "department".into(),
            value: None,
        };
        assert!(!set.is_match(&identity()));
    }

    #[test]
    fn selector_rule_result_is_coerced() {
        let yes = MatchExpressionEvaluator::with_rules(Arc::new(Fixed(Some("TRUE".into()))));
        let no = MatchExpressionEvaluator::with_rules(Arc::new(Fixed(None)));
        let selector = IdentitySelector::rule("InScope");
        assert!(yes.is_match(&selector, &identity()).unwrap());
        assert!(!no.is_match(&selector, &identity()).unwrap());
    }

    #[test]
    fn expression_and_rule_must_both_match() {
        let selector = IdentitySelector {
            summary: None,
            match_expression: Some(MatchExpression::any(vec![MatchTerm::new(
                "department",
                "Sales",
            )])),
            rule: Some(RuleRef::new("InScope")),
        };
        let eval = MatchExpressionEvaluator::with_rules(Arc::new(Fixed(Some(true.into()))));
        assert!(!eval.is_match(&selector, &identity()).unwrap());
    }

    #[test]
    fn selector_rule_failure_propagates() {
        let eval = MatchExpressionEvaluator::with_rules(Arc::new(Broken));
        let err = eval
            .is_match(&IdentitySelector::rule("InScope"), &identity())
            .unwrap_err();
        assert!(matches!(err, RuleExecutionError::SelectorFailed { .. }));
    }

    #[test]
    fn selector_rule_without_executor_fails() {
        let err = MatchExpressionEvaluator::new()
            .is_match(&IdentitySelector::rule("InScope"), &identity())
            .unwrap_err();
        assert!(err.to_string().contains("no rule executor"));
    }
}
