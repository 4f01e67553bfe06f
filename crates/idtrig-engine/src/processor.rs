//! # Trigger Processor
//!
//! Entry point for identity refresh. Holds the registered trigger
//! definitions and runs every one of them against a previous/new snapshot
//! pair, recording each decision in an [`AuditTrail`].
//!
//! ## Determinism
//!
//! Definitions are kept in a `BTreeMap` keyed by [`TriggerId`], so results
//! always come back in identifier order.
//!
//! ## Failure isolation
//!
//! A trigger that fails (bad configuration, failing rule or selector) yields
//! a [`TriggerStatus::Failed`] result. The remaining triggers still run.

use std::collections::BTreeMap;
use std::sync::Arc;

use idtrig_core::{IdentityName, IdentitySnapshot, TriggerId};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::audit::{AuditEntry, AuditEntryType, AuditTrail};
use crate::context::{PolicyPredicateEvaluator, RuleExecutor, SelectorEvaluator, TriggerContext};
use crate::definition::{TriggerDefinition, TriggerType};
use crate::error::ConfigurationError;
use crate::event::ChangeEvent;
use crate::matcher;
use crate::registry::TriggerRegistry;
use crate::rules::{BusinessProcessConfig, RuleLibrary};
use crate::selector::MatchExpressionEvaluator;

/// Why a trigger was not evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The definition is disabled.
    Disabled,
    /// The registry reports the definition inactive.
    Inactive,
}

impl SkipReason {
    /// Return the reason name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Inactive => "inactive",
        }
    }
}

/// Outcome for one trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerStatus {
    /// Evaluated and did not fire.
    NotMatched,
    /// Fired. `event` is absent when the type builds none for these
    /// snapshots.
    Matched {
        /// The built event.
        event: Option<Box<ChangeEvent>>,
    },
    /// Not evaluated.
    Skipped {
        /// Why.
        reason: SkipReason,
    },
    /// Matching or event construction failed.
    Failed {
        /// Error message.
        error: String,
    },
}

/// Result of running one trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerResult {
    /// Trigger identifier.
    pub trigger_id: TriggerId,
    /// Trigger type.
    pub trigger_type: TriggerType,
    /// Outcome.
    #[serde(flatten)]
    pub status: TriggerStatus,
}

impl TriggerResult {
    /// Whether the trigger fired.
    pub fn is_matched(&self) -> bool {
        matches!(self.status, TriggerStatus::Matched { .. })
    }

    /// Whether the trigger failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, TriggerStatus::Failed { .. })
    }

    /// The event, if one was built.
    pub fn event(&self) -> Option<&ChangeEvent> {
        match &self.status {
            TriggerStatus::Matched { event } => event.as_deref(),
            TriggerStatus::NotMatched
            | TriggerStatus::Skipped { .. }
            | TriggerStatus::Failed { .. } => None,
        }
    }
}

/// Runs registered triggers against identity refreshes.
///
/// Processing appends to the audit trail and takes `&mut self`; share
/// behind a `Mutex`.
pub struct TriggerProcessor {
    triggers: BTreeMap<TriggerId, TriggerDefinition>,
    registry: TriggerRegistry,
    selectors: Arc<dyn SelectorEvaluator>,
    rules: Arc<dyn RuleExecutor>,
    predicates: Arc<dyn PolicyPredicateEvaluator>,
    /// Record of every decision.
    pub audit_trail: AuditTrail,
}

impl TriggerProcessor {
    /// Create a processor with explicit collaborators.
    pub fn new(
        registry: TriggerRegistry,
        selectors: Arc<dyn SelectorEvaluator>,
        rules: Arc<dyn RuleExecutor>,
        predicates: Arc<dyn PolicyPredicateEvaluator>,
    ) -> Self {
        Self {
            triggers: BTreeMap::new(),
            registry,
            selectors,
            rules,
            predicates,
            audit_trail: AuditTrail::default(),
        }
    }

    /// Create a processor backed by declarative rules and business
    /// processes. Selector rules run through the same rule library.
    pub fn declarative(rules: RuleLibrary, processes: BusinessProcessConfig) -> Self {
        let rules = Arc::new(rules);
        let processes = Arc::new(processes);
        Self::new(
            TriggerRegistry::new(processes.clone()),
            Arc::new(MatchExpressionEvaluator::with_rules(rules.clone())),
            rules,
            processes,
        )
    }

    /// Builder: replace the audit trail with one of the given capacity.
    pub fn with_audit_capacity(mut self, max_entries: usize) -> Self {
        self.audit_trail = AuditTrail::new(max_entries);
        self
    }

    /// Validate and register a definition, returning any definition it
    /// replaced.
    pub fn register(
        &mut self,
        definition: TriggerDefinition,
    ) -> Result<Option<TriggerDefinition>, ConfigurationError> {
        definition.validate()?;
        Ok(self.triggers.insert(definition.id.clone(), definition))
    }

    /// Remove a definition.
    pub fn unregister(&mut self, id: &TriggerId) -> Option<TriggerDefinition> {
        self.triggers.remove(id)
    }

    /// Look up a definition.
    pub fn get(&self, id: &TriggerId) -> Option<&TriggerDefinition> {
        self.triggers.get(id)
    }

    /// All definitions in identifier order.
    pub fn list(&self) -> Vec<&TriggerDefinition> {
        self.triggers.values().collect()
    }

    /// Number of registered definitions.
    pub fn count(&self) -> usize {
        self.triggers.len()
    }

    /// The registry in use.
    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Whether any enabled, active trigger limits how many identities a
    /// single refresh may fire it for.
    pub fn has_processing_thresholds(&self) -> bool {
        self.triggers.values().any(|d| {
            !d.disabled
                && !self.registry.is_inactive(d)
                && d.parameters.identity_processing_threshold().is_some()
        })
    }

    /// Whether any enabled trigger needs the identity as it was before
    /// refresh. When `false` the caller may skip capturing it.
    pub fn needs_previous_snapshot(&self) -> bool {
        self.triggers
            .values()
            .any(|d| !d.disabled && d.capabilities().needs_previous_identity)
    }

    /// Run every registered trigger against one refresh.
    pub fn process(
        &mut self,
        previous: Option<&IdentitySnapshot>,
        new: Option<&IdentitySnapshot>,
    ) -> Vec<TriggerResult> {
        let Self {
            triggers,
            registry,
            selectors,
            rules,
            predicates,
            audit_trail,
        } = self;

        let identity: Option<IdentityName> = new.or(previous).map(|s| s.name.clone());
        audit_trail.append(AuditEntry::new(
            AuditEntryType::SnapshotReceived,
            identity.clone(),
            None,
            Some(json!({
                "previous": previous.is_some(),
                "new": new.is_some(),
                "trigger_count": triggers.len(),
            })),
        ));

        let ctx = TriggerContext::new(registry, &**selectors, &**rules, &**predicates);
        let mut results = Vec::with_capacity(triggers.len());

        for definition in triggers.values() {
            let status = run_one(definition, previous, new, &ctx);
            audit_trail.append(audit_entry(definition, identity.clone(), &status));
            results.push(TriggerResult {
                trigger_id: definition.id.clone(),
                trigger_type: definition.trigger_type,
                status,
            });
        }

        debug!(
            identity = identity.as_ref().map(IdentityName::as_str).unwrap_or_default(),
            matched = results.iter().filter(|r| r.is_matched()).count(),
            failed = results.iter().filter(|r| r.is_failed()).count(),
            "identity processed"
        );
        results
    }
}

fn run_one(
    definition: &TriggerDefinition,
    previous: Option<&IdentitySnapshot>,
    new: Option<&IdentitySnapshot>,
    ctx: &TriggerContext<'_>,
) -> TriggerStatus {
    let trigger = definition.id.as_str();
    if definition.disabled {
        info!(trigger, "trigger disabled; skipping");
        return TriggerStatus::Skipped {
            reason: SkipReason::Disabled,
        };
    }
    if ctx.registry.is_inactive(definition) {
        info!(trigger, "trigger inactive; skipping");
        return TriggerStatus::Skipped {
            reason: SkipReason::Inactive,
        };
    }
    match matcher::evaluate(definition, previous, new, ctx) {
        Ok(result) if result.matched => TriggerStatus::Matched {
            event: result.event.map(Box::new),
        },
        Ok(_) => TriggerStatus::NotMatched,
        Err(error) => {
            warn!(trigger, %error, "trigger evaluation failed");
            TriggerStatus::Failed {
                error: error.to_string(),
            }
        }
    }
}

fn audit_entry(
    definition: &TriggerDefinition,
    identity: Option<IdentityName>,
    status: &TriggerStatus,
) -> AuditEntry {
    let (entry_type, metadata) = match status {
        TriggerStatus::NotMatched => (AuditEntryType::TriggerEvaluated, json!({"matched": false})),
        TriggerStatus::Matched { event: None } => {
            (AuditEntryType::TriggerEvaluated, json!({"matched": true}))
        }
        TriggerStatus::Matched { event: Some(event) } => (
            AuditEntryType::EventCreated,
            json!({
                "event_id": event.event_id.to_string(),
                "cause": event.cause(),
            }),
        ),
        TriggerStatus::Skipped { reason } => {
            (AuditEntryType::TriggerSkipped, json!({"reason": reason.as_str()}))
        }
        TriggerStatus::Failed { error } => (AuditEntryType::TriggerFailed, json!({"error": error})),
    };
    AuditEntry::new(entry_type, identity, Some(definition.id.clone()), Some(metadata))
}

impl std::fmt::Debug for TriggerProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerProcessor")
            .field("trigger_count", &self.triggers.len())
            .field("audit_trail_size", &self.audit_trail.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{BusinessProcess, RuleBody};

    fn snapshot(name: &str) -> IdentitySnapshot {
        IdentitySnapshot::new(IdentityName::new(name).unwrap())
    }

    fn def(id: &str, t: TriggerType) -> TriggerDefinition {
        TriggerDefinition::new(TriggerId::new(id).unwrap(), t)
    }

    fn processor() -> TriggerProcessor {
        let rules = RuleLibrary::new()
            .with_rule("AlwaysTrueRule", RuleBody::Constant { value: true.into() });
        let processes = BusinessProcessConfig::new()
            .with_process("joiner", BusinessProcess::new(RuleBody::Constant { value: true.into() }))
            .with_process(
                "leaver",
                BusinessProcess {
                    enabled: false,
                    condition: None,
                },
            );
        TriggerProcessor::declarative(rules, processes)
    }

    #[test]
    fn register_validates() {
        let mut p = processor();
        let err = p.register(def("bad", TriggerType::AttributeChange)).unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingAttributeName { .. }));
        assert_eq!(p.count(), 0);

        assert!(p.register(def("d", TriggerType::Delete)).unwrap().is_none());
        assert!(p.register(def("d", TriggerType::Delete)).unwrap().is_some());
        assert_eq!(p.count(), 1);
        assert!(p.unregister(&TriggerId::new("d").unwrap()).is_some());
        assert_eq!(p.count(), 0);
    }

    #[test]
    fn results_come_back_in_id_order() {
        let mut p = processor();
        p.register(def("zeta", TriggerType::Delete)).unwrap();
        p.register(def("alpha", TriggerType::Delete)).unwrap();
        let ids: Vec<_> = p.list().iter().map(|d| d.id.to_string()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);

        let results = p.process(Some(&snapshot("a")), None);
        assert_eq!(results[0].trigger_id.as_str(), "alpha");
        assert!(results.iter().all(TriggerResult::is_matched));
    }

    #[test]
    fn disabled_and_inactive_are_skipped() {
        let mut p = processor();
        p.register(def("off", TriggerType::Delete).disabled()).unwrap();
        p.register(def("leaver", TriggerType::RapidSetup).with_match_process("leaver"))
            .unwrap();
        p.register(def("joiner", TriggerType::RapidSetup).with_match_process("joiner"))
            .unwrap();

        let results = p.process(None, Some(&snapshot("a")));
        let by_id: BTreeMap<_, _> = results.iter().map(|r| (r.trigger_id.as_str(), r)).collect();
        assert_eq!(
            by_id["off"].status,
            TriggerStatus::Skipped { reason: SkipReason::Disabled }
        );
        assert_eq!(
            by_id["leaver"].status,
            TriggerStatus::Skipped { reason: SkipReason::Inactive }
        );
        assert!(by_id["joiner"].is_matched());
        assert_eq!(p.audit_trail.entries_by_type(AuditEntryType::TriggerSkipped).len(), 2);
    }

    #[test]
    fn failing_trigger_does_not_stop_batch() {
        let mut p = processor();
        p.register(def("a-rule", TriggerType::Rule).with_rule("Missing")).unwrap();
        p.register(def("b-delete", TriggerType::Delete)).unwrap();

        let results = p.process(Some(&snapshot("a")), None);
        assert!(results[0].is_failed());
        assert!(results[1].is_matched());
        assert_eq!(p.audit_trail.entries_by_type(AuditEntryType::TriggerFailed).len(), 1);
        assert_eq!(p.audit_trail.entries_by_type(AuditEntryType::SnapshotReceived).len(), 1);
    }

    #[test]
    fn rule_trigger_runs_without_snapshots() {
        let mut p = processor();
        p.register(def("always", TriggerType::Rule).with_rule("AlwaysTrueRule")).unwrap();
        let results = p.process(None, None);
        assert!(results[0].is_matched());
        assert!(results[0].event().is_some());
    }

    #[test]
    fn matched_event_is_audited_with_cause() {
        let mut p = processor();
        p.register(def("gone", TriggerType::Delete)).unwrap();
        p.process(Some(&snapshot("jdoe")), None);
        let created = p.audit_trail.entries_by_type(AuditEntryType::EventCreated);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].identity.as_ref().map(IdentityName::as_str), Some("jdoe"));
        let metadata = created[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["cause"], "Identity deleted");
    }

    #[test]
    fn processing_thresholds_consider_enabled_active_triggers() {
        let mut p = processor();
        let mut leaver = def("leaver", TriggerType::RapidSetup).with_match_process("leaver");
        leaver.parameters.set_identity_processing_threshold("10");
        p.register(leaver).unwrap();
        assert!(!p.has_processing_thresholds());

        let mut joiner = def("joiner", TriggerType::RapidSetup).with_match_process("joiner");
        joiner.parameters.set_identity_processing_threshold("10");
        p.register(joiner.clone()).unwrap();
        assert!(p.has_processing_thresholds());

        p.register(joiner.disabled()).unwrap();
        assert!(!p.has_processing_thresholds());
    }

    #[test]
    fn previous_snapshot_needed_only_for_comparing_types() {
        let mut p = processor();
        p.register(def("create", TriggerType::Create)).unwrap();
        p.register(def("alert", TriggerType::Alert)).unwrap();
        assert!(!p.needs_previous_snapshot());
        p.register(def("delete", TriggerType::Delete).disabled()).unwrap();
        assert!(!p.needs_previous_snapshot());
        p.register(def("title", TriggerType::AttributeChange).with_attribute("title"))
            .unwrap();
        assert!(p.needs_previous_snapshot());
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let result = TriggerResult {
            trigger_id: TriggerId::new("x").unwrap(),
            trigger_type: TriggerType::Alert,
            status: TriggerStatus::Skipped { reason: SkipReason::Inactive },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "inactive");
        assert_eq!(json["trigger_type"], "Alert");
    }
}
