//! # Declarative Rules and Business Processes
//!
//! The engine never runs scripts. Deployments that do not bring their own
//! [`RuleExecutor`] can describe rules declaratively with [`RuleBody`] and
//! load them into a [`RuleLibrary`]. RapidSetup business processes are
//! described the same way in a [`BusinessProcessConfig`], which serves as
//! both the RapidSetup inactivity check and its policy predicate.

use std::collections::BTreeMap;

use idtrig_core::value::null_safe_eq;
use idtrig_core::{AttributeValue, IdentitySnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{PolicyPredicateEvaluator, RuleExecutor, RuleParams};
use crate::definition::{RuleRef, TriggerDefinition};
use crate::error::RuleExecutionError;
use crate::registry::InactivityCheck;
use crate::selector::MatchExpression;

/// A rule expressed as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleBody {
    /// Always returns `value`.
    Constant {
        /// The returned value.
        value: AttributeValue,
    },
    /// `true` when `attribute` differs between the previous and new identity.
    /// An absent identity reads as an unset attribute.
    AttributeChanged {
        /// Attribute to compare.
        attribute: String,
    },
    /// `true` when a new identity is present and matches `expression`.
    NewIdentityMatches {
        /// Expression evaluated against the new identity.
        expression: MatchExpression,
    },
}

impl RuleBody {
    /// Evaluate against rule parameters.
    pub fn evaluate(&self, params: &RuleParams<'_>) -> Option<AttributeValue> {
        match self {
            Self::Constant { value } => Some(value.clone()),
            Self::AttributeChanged { attribute } => {
                let old = params.previous.and_then(|i| i.attribute(attribute));
                let new = params.new.and_then(|i| i.attribute(attribute));
                Some(AttributeValue::Bool(!null_safe_eq(old, new)))
            }
            Self::NewIdentityMatches { expression } => Some(AttributeValue::Bool(
                params.new.is_some_and(|i| expression.is_match(i)),
            )),
        }
    }
}

/// Named rules, looked up by [`RuleRef`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleLibrary {
    rules: BTreeMap<String, RuleBody>,
}

impl RuleLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a rule.
    pub fn with_rule(mut self, name: impl Into<String>, body: RuleBody) -> Self {
        self.insert(name, body);
        self
    }

    /// Add or replace a rule.
    pub fn insert(&mut self, name: impl Into<String>, body: RuleBody) -> Option<RuleBody> {
        self.rules.insert(name.into(), body)
    }

    /// Look up a rule.
    pub fn get(&self, name: &str) -> Option<&RuleBody> {
        self.rules.get(name)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleExecutor for RuleLibrary {
    fn run_rule(
        &self,
        rule: &RuleRef,
        params: &RuleParams<'_>,
    ) -> Result<Option<AttributeValue>, RuleExecutionError> {
        let body = self
            .get(&rule.name)
            .ok_or_else(|| RuleExecutionError::RuleNotFound {
                rule: rule.name.clone(),
            })?;
        let result = body.evaluate(params);
        debug!(rule = %rule, ?result, "rule evaluated");
        Ok(result)
    }
}

/// A RapidSetup business process (joiner, mover, leaver, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProcess {
    /// Disabled processes make their triggers inactive.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Condition under which the process fires. Without one it never fires.
    #[serde(default)]
    pub condition: Option<RuleBody>,
}

fn default_enabled() -> bool {
    true
}

impl BusinessProcess {
    /// An enabled process firing on `condition`.
    pub fn new(condition: RuleBody) -> Self {
        Self {
            enabled: true,
            condition: Some(condition),
        }
    }
}

/// RapidSetup business processes keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessProcessConfig {
    processes: BTreeMap<String, BusinessProcess>,
}

impl BusinessProcessConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a process.
    pub fn with_process(mut self, name: impl Into<String>, process: BusinessProcess) -> Self {
        self.processes.insert(name.into(), process);
        self
    }

    /// Look up a process.
    pub fn get(&self, name: &str) -> Option<&BusinessProcess> {
        self.processes.get(name)
    }

    /// Names of all configured processes.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processes.keys().map(String::as_str)
    }
}

impl InactivityCheck for BusinessProcessConfig {
    fn is_inactive(&self, definition: &TriggerDefinition) -> bool {
        definition
            .match_process()
            .and_then(|name| self.get(&name))
            .map_or(true, |process| !process.enabled)
    }
}

impl PolicyPredicateEvaluator for BusinessProcessConfig {
    fn evaluate(
        &self,
        definition: &TriggerDefinition,
        new: Option<&IdentitySnapshot>,
        previous: Option<&IdentitySnapshot>,
    ) -> Result<bool, RuleExecutionError> {
        let name = definition.match_process().unwrap_or_default();
        let process = self
            .get(&name)
            .ok_or_else(|| RuleExecutionError::PredicateFailed {
                process: name.clone(),
                reason: "business process is not configured".to_string(),
            })?;
        let Some(condition) = &process.condition else {
            debug!(process = %name, "business process has no condition");
            return Ok(false);
        };
        let params = RuleParams {
            previous,
            new,
            trigger: Some(definition),
        };
        Ok(condition.evaluate(&params).is_some_and(|v| v.is_truthy()))
    }
}
