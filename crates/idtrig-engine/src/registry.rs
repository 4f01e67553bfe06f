//! # Trigger Type Registry
//!
//! Static capability records for each [`TriggerType`] plus the inactivity
//! check. Capabilities are fixed lookup data; only `RapidSetup` consults an
//! injected [`InactivityCheck`], every other variant always reports active.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::definition::{TriggerDefinition, TriggerType};

/// What a trigger type needs from the identity refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// The type compares a previous and a new identity.
    pub compares_two_identities: bool,
    /// The previous identity must be captured before refresh.
    pub needs_previous_identity: bool,
    /// The new identity must be available after refresh.
    pub needs_new_identity: bool,
}

impl Capabilities {
    const fn of(compares: bool, previous: bool, new: bool) -> Self {
        Self {
            compares_two_identities: compares,
            needs_previous_identity: previous,
            needs_new_identity: new,
        }
    }
}

impl TriggerType {
    /// The static capability record of this type.
    pub const fn capabilities(&self) -> Capabilities {
        match self {
            Self::Create => Capabilities::of(false, false, true),
            Self::Delete => Capabilities::of(false, true, false),
            Self::AttributeChange
            | Self::Rule
            | Self::ManagerTransfer
            | Self::NativeChange
            | Self::RapidSetup => Capabilities::of(true, true, true),
            Self::Alert => Capabilities::of(false, false, false),
        }
    }
}

/// Decides whether a RapidSetup trigger's business process is inactive.
pub trait InactivityCheck: Send + Sync {
    /// `true` if the definition must not be evaluated.
    fn is_inactive(&self, definition: &TriggerDefinition) -> bool;
}

/// Inactivity check that never deactivates anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysActive;

impl InactivityCheck for AlwaysActive {
    fn is_inactive(&self, _definition: &TriggerDefinition) -> bool {
        false
    }
}

/// Registry of trigger types and the inactivity predicate wired to RapidSetup.
#[derive(Clone)]
pub struct TriggerRegistry {
    rapid_setup: Arc<dyn InactivityCheck>,
}

impl TriggerRegistry {
    /// Registry where RapidSetup consults `check`.
    pub fn new(check: Arc<dyn InactivityCheck>) -> Self {
        Self { rapid_setup: check }
    }

    /// Capability record for a type.
    pub fn capabilities(&self, trigger_type: TriggerType) -> Capabilities {
        trigger_type.capabilities()
    }

    /// Whether the definition is inactive.
    pub fn is_inactive(&self, definition: &TriggerDefinition) -> bool {
        match definition.trigger_type {
            TriggerType::RapidSetup => self.rapid_setup.is_inactive(definition),
            TriggerType::Create
            | TriggerType::Delete
            | TriggerType::AttributeChange
            | TriggerType::Rule
            | TriggerType::ManagerTransfer
            | TriggerType::NativeChange
            | TriggerType::Alert => false,
        }
    }
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::new(Arc::new(AlwaysActive))
    }
}

impl std::fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerRegistry").finish_non_exhaustive()
    }
}
