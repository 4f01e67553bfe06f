//! # Change Events
//!
//! A [`ChangeEvent`] is built once per fired trigger and handed to an
//! external dispatcher. It carries the originating definition so consumers
//! can tell `AttributeChange`, `ManagerTransfer`, `Rule`, and `RapidSetup`
//! events apart even though they share a payload shape.

use chrono::{DateTime, Utc};
use idtrig_core::{IdentityName, IdentitySnapshot, NativeChangeDetection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::definition::{TriggerDefinition, TriggerType};
use crate::error::TriggerError;

/// What happened to the identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangePayload {
    /// The identity was created.
    Created {
        /// The new identity.
        identity: IdentitySnapshot,
    },
    /// The identity was deleted.
    Deleted {
        /// Name of the deleted identity.
        identity_name: IdentityName,
    },
    /// An attribute changed or a rule or business process matched.
    AttributeOrRuleMatched {
        /// Identity before refresh.
        previous: Option<IdentitySnapshot>,
        /// Identity after refresh.
        new: Option<IdentitySnapshot>,
    },
    /// Native account changes were detected.
    NativeChangesDetected {
        /// Identity owning the changed accounts.
        identity_name: IdentityName,
        /// The detected changes, never empty.
        changes: Vec<NativeChangeDetection>,
    },
}

impl ChangePayload {
    /// Identity before refresh, where the payload carries one.
    pub fn previous(&self) -> Option<&IdentitySnapshot> {
        match self {
            Self::AttributeOrRuleMatched { previous, .. } => previous.as_ref(),
            Self::Created { .. } | Self::Deleted { .. } | Self::NativeChangesDetected { .. } => None,
        }
    }

    /// Identity after refresh, where the payload carries one.
    pub fn new_identity(&self) -> Option<&IdentitySnapshot> {
        match self {
            Self::Created { identity } => Some(identity),
            Self::AttributeOrRuleMatched { new, .. } => new.as_ref(),
            Self::Deleted { .. } | Self::NativeChangesDetected { .. } => None,
        }
    }

    /// Name of the identity the event concerns.
    pub fn identity_name(&self) -> Option<&IdentityName> {
        match self {
            Self::Created { identity } => Some(&identity.name),
            Self::Deleted { identity_name } | Self::NativeChangesDetected { identity_name, .. } => {
                Some(identity_name)
            }
            Self::AttributeOrRuleMatched { previous, new } => {
                new.as_ref().or(previous.as_ref()).map(|s| &s.name)
            }
        }
    }

    /// Detected native changes; empty for other payloads.
    pub fn native_changes(&self) -> &[NativeChangeDetection] {
        match self {
            Self::NativeChangesDetected { changes, .. } => changes,
            Self::Created { .. } | Self::Deleted { .. } | Self::AttributeOrRuleMatched { .. } => &[],
        }
    }
}

/// A fired trigger's event, stamped with its originating definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was built.
    pub created_at: DateTime<Utc>,
    /// The trigger that fired.
    pub trigger: TriggerDefinition,
    /// What happened.
    pub payload: ChangePayload,
}

impl ChangeEvent {
    /// Stamp `payload` with `trigger`.
    pub fn new(trigger: TriggerDefinition, payload: ChangePayload) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            created_at: Utc::now(),
            trigger,
            payload,
        }
    }

    /// Name of the identity the event concerns.
    pub fn identity_name(&self) -> Option<&IdentityName> {
        self.payload.identity_name()
    }

    /// Human-readable cause. See [`crate::cause::format_cause`].
    pub fn cause(&self) -> String {
        crate::cause::format_cause(self)
    }
}

/// Build the event for a fired trigger.
///
/// `Ok(None)` means the trigger type produces no event for these snapshots:
/// always for `Alert`, and for `NativeChange` when no native changes were
/// recorded. `NativeChange` reads the new identity and only consults the
/// previous one when the new identity is absent; a new identity with an
/// empty change list yields no event even if the previous one has changes.
pub fn create_event(
    definition: &TriggerDefinition,
    previous: Option<&IdentitySnapshot>,
    new: Option<&IdentitySnapshot>,
) -> Result<Option<ChangeEvent>, TriggerError> {
    let payload = match definition.trigger_type {
        TriggerType::Create => ChangePayload::Created {
            identity: require(definition, new, "new")?.clone(),
        },
        TriggerType::Delete => ChangePayload::Deleted {
            identity_name: require(definition, previous, "previous")?.name.clone(),
        },
        TriggerType::AttributeChange
        | TriggerType::ManagerTransfer
        | TriggerType::Rule
        | TriggerType::RapidSetup => ChangePayload::AttributeOrRuleMatched {
            previous: previous.cloned(),
            new: new.cloned(),
        },
        TriggerType::NativeChange => {
            let source = match new {
                Some(identity) => identity,
                None => match previous {
                    Some(identity) => identity,
                    None => return Ok(None),
                },
            };
            if source.native_changes().is_empty() {
                return Ok(None);
            }
            ChangePayload::NativeChangesDetected {
                identity_name: source.name.clone(),
                changes: source.native_changes().to_vec(),
            }
        }
        TriggerType::Alert => return Ok(None),
    };
    Ok(Some(ChangeEvent::new(definition.clone(), payload)))
}

fn require<'a>(
    definition: &TriggerDefinition,
    snapshot: Option<&'a IdentitySnapshot>,
    role: &'static str,
) -> Result<&'a IdentitySnapshot, TriggerError> {
    snapshot.ok_or_else(|| TriggerError::MissingSnapshot {
        trigger: definition.id.to_string(),
        trigger_type: definition.trigger_type,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use idtrig_core::{AccountOperation, Difference, TriggerId};

    fn snapshot(name: &str) -> IdentitySnapshot {
        IdentitySnapshot::new(IdentityName::new(name).unwrap())
    }

    fn def(t: TriggerType) -> TriggerDefinition {
        TriggerDefinition::new(TriggerId::new("t").unwrap(), t)
    }

    fn native(op: AccountOperation) -> NativeChangeDetection {
        NativeChangeDetection {
            application: Some("AD".into()),
            native_identity: Some("cn=jdoe".into()),
            operation: Some(op),
            differences: vec![Difference::multi("memberOf", vec!["admins".into()], vec![])],
        }
    }

    #[test]
    fn create_wraps_new_identity() {
        let new = snapshot("jdoe").with_create_pending();
        let event = create_event(&def(TriggerType::Create), None, Some(&new))
            .unwrap()
            .unwrap();
        assert_eq!(event.payload, ChangePayload::Created { identity: new });
        assert_eq!(event.trigger, def(TriggerType::Create));
    }

    #[test]
    fn create_without_new_identity_is_an_error() {
        let err = create_event(&def(TriggerType::Create), Some(&snapshot("a")), None).unwrap_err();
        assert!(matches!(err, TriggerError::MissingSnapshot { role: "new", .. }));
    }

    #[test]
    fn delete_carries_previous_name() {
        let event = create_event(&def(TriggerType::Delete), Some(&snapshot("jdoe")), None)
            .unwrap()
            .unwrap();
        assert_eq!(event.identity_name().map(IdentityName::as_str), Some("jdoe"));
        let err = create_event(&def(TriggerType::Delete), None, None).unwrap_err();
        assert!(matches!(err, TriggerError::MissingSnapshot { role: "previous", .. }));
    }

    #[test]
    fn comparison_types_share_payload_shape() {
        let before = snapshot("a");
        let after = snapshot("a").with_attribute("title", "Lead");
        for t in [
            TriggerType::AttributeChange,
            TriggerType::ManagerTransfer,
            TriggerType::Rule,
            TriggerType::RapidSetup,
        ] {
            let event = create_event(&def(t), Some(&before), Some(&after)).unwrap().unwrap();
            assert_eq!(event.payload.previous(), Some(&before));
            assert_eq!(event.payload.new_identity(), Some(&after));
            assert_eq!(event.trigger.trigger_type, t);
        }
    }

    #[test]
    fn alert_builds_nothing() {
        let a = snapshot("a");
        assert!(create_event(&def(TriggerType::Alert), Some(&a), Some(&a)).unwrap().is_none());
    }

    #[test]
    fn native_change_reads_new_identity_first() {
        let d = def(TriggerType::NativeChange);
        let with_change = snapshot("a").with_native_change(native(AccountOperation::Create));

        let event = create_event(&d, Some(&snapshot("a")), Some(&with_change))
            .unwrap()
            .unwrap();
        assert_eq!(event.payload.native_changes().len(), 1);

        let empty_new = snapshot("a");
        assert!(create_event(&d, Some(&with_change), Some(&empty_new)).unwrap().is_none());
    }

    #[test]
    fn native_change_falls_back_to_previous_only_when_new_absent() {
        let d = def(TriggerType::NativeChange);
        let with_change = snapshot("a").with_native_change(native(AccountOperation::Delete));
        let event = create_event(&d, Some(&with_change), None).unwrap().unwrap();
        assert!(matches!(
            event.payload,
            ChangePayload::NativeChangesDetected { ref changes, .. } if changes.len() == 1
        ));
        assert!(create_event(&d, None, None).unwrap().is_none());
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let payload = ChangePayload::Deleted {
            identity_name: IdentityName::new("jdoe").unwrap(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "deleted");
        assert_eq!(json["identity_name"], "jdoe");
    }

    #[test]
    fn events_get_distinct_ids() {
        let d = def(TriggerType::Delete);
        let a = create_event(&d, Some(&snapshot("a")), None).unwrap().unwrap();
        let b = create_event(&d, Some(&snapshot("a")), None).unwrap().unwrap();
        assert_ne!(a.event_id, b.event_id);
    }
}
