//! # Identity Snapshots
//!
//! A point-in-time view of an identity as seen by trigger processing: its
//! attributes, whether create processing is still pending, and the native
//! (out-of-band) account changes detected since the last refresh.
//!
//! Two snapshots are compared per refresh. An absent previous snapshot means
//! the identity was just created; an absent new snapshot means it was deleted.

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::csv::list_to_csv;
use crate::error::IdtError;
use crate::identity::IdentityName;
use crate::value::AttributeValue;

/// Attribute holding the name of an identity's manager.
pub const MANAGER_ATTRIBUTE: &str = "manager";

/// A point-in-time view of one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    /// Unique identity name.
    pub name: IdentityName,
    /// Identity attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// One-shot flag set when the identity is created and cleared by the
    /// refresh process once create triggers have fired.
    #[serde(default)]
    pub needs_create_processing: bool,
    /// Native account changes detected on source systems.
    #[serde(default)]
    pub native_changes: Vec<NativeChangeDetection>,
}

impl IdentitySnapshot {
    /// Create a snapshot with no attributes.
    pub fn new(name: IdentityName) -> Self {
        Self {
            name,
            attributes: Attributes::new(),
            needs_create_processing: false,
            native_changes: Vec::new(),
        }
    }

    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, IdtError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder: set an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.set(key, value);
        self
    }

    /// Builder: mark create processing as pending.
    pub fn with_create_pending(mut self) -> Self {
        self.needs_create_processing = true;
        self
    }

    /// Builder: record a native change detection.
    pub fn with_native_change(mut self, change: NativeChangeDetection) -> Self {
        self.native_changes.push(change);
        self
    }

    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// The manager attribute, if set.
    pub fn manager(&self) -> Option<&AttributeValue> {
        self.attributes.get(MANAGER_ATTRIBUTE)
    }

    /// Whether create triggers still need to run for this identity.
    pub fn needs_create_processing(&self) -> bool {
        self.needs_create_processing
    }

    /// Set or clear the create-processing flag. Owned by the refresh process.
    pub fn set_needs_create_processing(&mut self, needs: bool) {
        self.needs_create_processing = needs;
    }

    /// Native change detections recorded on this snapshot.
    pub fn native_changes(&self) -> &[NativeChangeDetection] {
        &self.native_changes
    }
}

/// The account operation observed by a native change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountOperation {
    /// Account created.
    Create,
    /// Account attributes modified.
    Modify,
    /// Account deleted.
    Delete,
    /// Account enabled.
    Enable,
    /// Account disabled.
    Disable,
    /// Account unlocked.
    Unlock,
    /// Account locked.
    Lock,
}

impl AccountOperation {
    /// Return the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Modify => "Modify",
            Self::Delete => "Delete",
            Self::Enable => "Enable",
            Self::Disable => "Disable",
            Self::Unlock => "Unlock",
            Self::Lock => "Lock",
        }
    }
}

impl std::fmt::Display for AccountOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change made directly on a source-system account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeChangeDetection {
    /// Source application name.
    #[serde(default)]
    pub application: Option<String>,
    /// Account identifier on the source application.
    #[serde(default)]
    pub native_identity: Option<String>,
    /// Observed operation; unset reads as [`AccountOperation::Modify`].
    #[serde(default)]
    pub operation: Option<AccountOperation>,
    /// Attribute-level differences.
    #[serde(default)]
    pub differences: Vec<Difference>,
}

impl NativeChangeDetection {
    /// The operation, defaulting to `Modify` when unset.
    pub fn effective_operation(&self) -> AccountOperation {
        self.operation.unwrap_or(AccountOperation::Modify)
    }
}

/// A single attribute difference between two account states.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Difference {
    /// Attribute name.
    #[serde(default)]
    pub attribute: Option<String>,
    /// Previous single value.
    #[serde(default)]
    pub old_value: Option<String>,
    /// New single value.
    #[serde(default)]
    pub new_value: Option<String>,
    /// Values added to a multi-valued attribute.
    #[serde(default)]
    pub added_values: Vec<String>,
    /// Values removed from a multi-valued attribute.
    #[serde(default)]
    pub removed_values: Vec<String>,
}

impl Difference {
    /// A single-valued modification.
    pub fn modified(
        attribute: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            attribute: Some(attribute.into()),
            old_value,
            new_value,
            ..Self::default()
        }
    }

    /// A multi-valued change.
    pub fn multi(attribute: impl Into<String>, added: Vec<String>, removed: Vec<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            added_values: added,
            removed_values: removed,
            ..Self::default()
        }
    }

    /// Added values as CSV, `None` when nothing was added.
    pub fn added_values_csv(&self) -> Option<String> {
        list_to_csv(&self.added_values)
    }

    /// Removed values as CSV, `None` when nothing was removed.
    pub fn removed_values_csv(&self) -> Option<String> {
        list_to_csv(&self.removed_values)
    }
}
