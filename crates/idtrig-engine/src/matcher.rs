//! # Trigger Matcher
//!
//! Decides whether a trigger fires for one identity refresh. The decision
//! runs in two steps:
//!
//! 1. If the trigger has a selector, the subject identity (new, else
//!    previous) must be selected. Otherwise the trigger does not fire.
//! 2. The trigger type decides, as follows:
//!
//! | Type              | Fires when                                                   |
//! |-------------------|--------------------------------------------------------------|
//! | `Create`          | new identity present and create processing pending           |
//! | `Delete`          | new identity absent                                          |
//! | `AttributeChange` | both present, attribute differs, filters pass                |
//! | `ManagerTransfer` | as `AttributeChange` on the `manager` attribute              |
//! | `Rule`            | the rule's result is truthy                                  |
//! | `NativeChange`    | always (selector already passed)                             |
//! | `Alert`           | never                                                        |
//! | `RapidSetup`      | active and the business-process predicate holds              |
//!
//! Mismatches are `Ok(false)`. Collaborator failures propagate.

use idtrig_core::value::null_safe_eq;
use idtrig_core::IdentitySnapshot;
use serde::Serialize;
use tracing::{debug, info};

use crate::context::{RuleParams, TriggerContext};
use crate::definition::{TriggerDefinition, TriggerType};
use crate::error::{ConfigurationError, TriggerError};
use crate::event::ChangeEvent;
use crate::filter::matches_filters;

/// Outcome of one match attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// Whether the trigger fired.
    pub matched: bool,
    /// The event, when the trigger fired and produced one.
    pub event: Option<ChangeEvent>,
}

impl MatchResult {
    /// A trigger that did not fire.
    pub fn not_matched() -> Self {
        Self {
            matched: false,
            event: None,
        }
    }
}

/// Whether `definition` fires for the given snapshots.
pub fn matches(
    definition: &TriggerDefinition,
    previous: Option<&IdentitySnapshot>,
    new: Option<&IdentitySnapshot>,
    ctx: &TriggerContext<'_>,
) -> Result<bool, TriggerError> {
    let trigger = definition.id.as_str();

    if let Some(selector) = &definition.selector {
        let selected = match new.or(previous) {
            Some(subject) => ctx.selectors.is_match(selector, subject)?,
            None => false,
        };
        if !selected {
            if definition.trigger_type == TriggerType::RapidSetup {
                info!(
                    trigger,
                    process = definition.match_process().as_deref().unwrap_or_default(),
                    "identity not selected for business process"
                );
            } else {
                debug!(trigger, "selector rejected identity");
            }
            return Ok(false);
        }
    }

    let matched = match definition.trigger_type {
        TriggerType::Create => new.is_some_and(IdentitySnapshot::needs_create_processing),
        TriggerType::Delete => new.is_none(),
        TriggerType::AttributeChange | TriggerType::ManagerTransfer => {
            let attribute = definition.effective_attribute_name().ok_or_else(|| {
                ConfigurationError::MissingAttributeName {
                    trigger: trigger.to_string(),
                }
            })?;
            attribute_changed(definition, attribute, previous, new)
        }
        TriggerType::Rule => {
            let rule = definition
                .rule
                .as_ref()
                .ok_or_else(|| ConfigurationError::MissingRule {
                    trigger: trigger.to_string(),
                })?;
            let params = RuleParams {
                previous,
                new,
                trigger: Some(definition),
            };
            ctx.rules
                .run_rule(rule, &params)?
                .is_some_and(|result| result.is_truthy())
        }
        TriggerType::NativeChange => true,
        TriggerType::Alert => false,
        TriggerType::RapidSetup => {
            if ctx.registry.is_inactive(definition) {
                info!(
                    trigger,
                    process = definition.match_process().as_deref().unwrap_or_default(),
                    "business process inactive; skipping trigger"
                );
                false
            } else {
                ctx.predicates.evaluate(definition, new, previous)?
            }
        }
    };

    debug!(trigger, trigger_type = %definition.trigger_type, matched, "trigger evaluated");
    Ok(matched)
}

/// Match and, on success, build the event.
pub fn evaluate(
    definition: &TriggerDefinition,
    previous: Option<&IdentitySnapshot>,
    new: Option<&IdentitySnapshot>,
    ctx: &TriggerContext<'_>,
) -> Result<MatchResult, TriggerError> {
    if !matches(definition, previous, new, ctx)? {
        return Ok(MatchResult::not_matched());
    }
    Ok(MatchResult {
        matched: true,
        event: crate::event::create_event(definition, previous, new)?,
    })
}

fn attribute_changed(
    definition: &TriggerDefinition,
    attribute: &str,
    previous: Option<&IdentitySnapshot>,
    new: Option<&IdentitySnapshot>,
) -> bool {
    let (Some(previous), Some(new)) = (previous, new) else {
        return false;
    };
    let old_value = previous.attribute(attribute);
    let new_value = new.attribute(attribute);
    !null_safe_eq(old_value, new_value)
        && matches_filters(
            old_value,
            new_value,
            definition.old_value_filter.as_deref(),
            definition.new_value_filter.as_deref(),
        )
}
