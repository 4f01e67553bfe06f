//! # Trigger Audit Trail
//!
//! Records what happened to every trigger during identity refresh: which
//! snapshots arrived, which triggers were evaluated or skipped, which events
//! were created, and which triggers failed.
//!
//! Every entry is individually digestable via `CanonicalBytes` +
//! `sha256_digest`. The trail is bounded; once over capacity the oldest 10%
//! of entries are dropped. Callers that need a durable record must drain
//! entries before that happens.

use chrono::{DateTime, Utc};
use idtrig_core::{sha256_digest, CanonicalBytes, ContentDigest, IdentityName, IdtError, TriggerId};
use serde::{Deserialize, Serialize};

/// Default capacity of an [`AuditTrail`].
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Kind of audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntryType {
    /// A previous/new snapshot pair arrived for processing.
    SnapshotReceived,
    /// A trigger was evaluated. Metadata records whether it matched.
    TriggerEvaluated,
    /// A trigger was not evaluated (disabled or inactive).
    TriggerSkipped,
    /// A change event was built.
    EventCreated,
    /// Matching or event construction failed.
    TriggerFailed,
}

impl AuditEntryType {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SnapshotReceived => "snapshot_received",
            Self::TriggerEvaluated => "trigger_evaluated",
            Self::TriggerSkipped => "trigger_skipped",
            Self::EventCreated => "event_created",
            Self::TriggerFailed => "trigger_failed",
        }
    }
}

impl std::fmt::Display for AuditEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Kind of record.
    pub entry_type: AuditEntryType,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// Identity being processed, if known.
    pub identity: Option<IdentityName>,
    /// Trigger concerned, if any.
    pub trigger_id: Option<TriggerId>,
    /// Structured details.
    pub metadata: Option<serde_json::Value>,
}

impl AuditEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        entry_type: AuditEntryType,
        identity: Option<IdentityName>,
        trigger_id: Option<TriggerId>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            entry_type,
            timestamp: Utc::now(),
            identity,
            trigger_id,
            metadata,
        }
    }

    /// Content digest of the entry. Fails when metadata holds floats.
    pub fn digest(&self) -> Result<ContentDigest, IdtError> {
        let canonical = CanonicalBytes::new(self)?;
        Ok(sha256_digest(&canonical))
    }
}

// Timestamps are excluded so replayed runs compare equal.
impl PartialEq for AuditEntry {
    fn eq(&self, other: &Self) -> bool {
        self.entry_type == other.entry_type
            && self.identity == other.identity
            && self.trigger_id == other.trigger_id
            && self.metadata == other.metadata
    }
}

impl Eq for AuditEntry {}

/// Bounded, append-only audit trail.
///
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
    max_entries: usize,
}

impl AuditTrail {
    /// Create a trail holding at most `max_entries` records (minimum one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Append, trimming the oldest 10% (at least one) when over capacity.
    pub fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let trim = (self.max_entries / 10).max(1);
            self.entries.drain(..trim);
        }
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the trail is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries recorded for an identity.
    pub fn entries_for_identity(&self, identity: &str) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.identity.as_ref().map(IdentityName::as_str) == Some(identity))
            .collect()
    }

    /// Entries recorded for a trigger.
    pub fn entries_for_trigger(&self, trigger: &TriggerId) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.trigger_id.as_ref() == Some(trigger))
            .collect()
    }

    /// Entries of one kind.
    pub fn entries_by_type(&self, entry_type: AuditEntryType) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .collect()
    }

    /// The most recent `n` entries.
    pub fn last_n(&self, n: usize) -> &[AuditEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Remove and return every entry.
    pub fn drain(&mut self) -> Vec<AuditEntry> {
        std::mem::take(&mut self.entries)
    }

    /// `(index, digest)` for every entry that canonicalizes.
    pub fn compute_digests(&self) -> Vec<(usize, ContentDigest)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match entry.digest() {
                Ok(d) => Some((i, d)),
                Err(error) => {
                    tracing::warn!(index = i, %error, "audit entry has no digest");
                    None
                }
            })
            .collect()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name(s: &str) -> Option<IdentityName> {
        Some(IdentityName::new(s).unwrap())
    }

    fn trigger(s: &str) -> Option<TriggerId> {
        Some(TriggerId::new(s).unwrap())
    }

    fn entry(t: AuditEntryType, identity: &str) -> AuditEntry {
        AuditEntry::new(t, name(identity), trigger("dept"), None)
    }

    #[test]
    fn trims_oldest_tenth_over_capacity() {
        let mut trail = AuditTrail::new(20);
        for i in 0..21 {
            trail.append(entry(AuditEntryType::TriggerEvaluated, &format!("id-{i}")));
        }
        assert_eq!(trail.len(), 19);
        assert_eq!(trail.entries()[0].identity, name("id-2"));
    }

    #[test]
    fn small_capacity_trims_at_least_one() {
        let mut trail = AuditTrail::new(0);
        assert_eq!(trail.capacity(), 1);
        trail.append(entry(AuditEntryType::SnapshotReceived, "a"));
        trail.append(entry(AuditEntryType::SnapshotReceived, "b"));
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.entries()[0].identity, name("b"));
    }

    #[test]
    fn filters_by_identity_trigger_and_type() {
        let mut trail = AuditTrail::default();
        trail.append(entry(AuditEntryType::SnapshotReceived, "alice"));
        trail.append(entry(AuditEntryType::EventCreated, "alice"));
        trail.append(AuditEntry::new(AuditEntryType::TriggerSkipped, name("bob"), trigger("other"), None));

        assert_eq!(trail.entries_for_identity("alice").len(), 2);
        assert_eq!(trail.entries_for_trigger(&TriggerId::new("other").unwrap()).len(), 1);
        assert_eq!(trail.entries_by_type(AuditEntryType::EventCreated).len(), 1);
        assert_eq!(trail.last_n(1)[0].entry_type, AuditEntryType::TriggerSkipped);
        assert_eq!(trail.last_n(10).len(), 3);
    }

    #[test]
    fn digest_is_stable_and_rejects_floats() {
        let a = AuditEntry::new(
            AuditEntryType::TriggerEvaluated,
            name("alice"),
            trigger("dept"),
            Some(json!({"matched": true})),
        );
        let b = a.clone();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        let float = AuditEntry::new(
            AuditEntryType::TriggerEvaluated,
            None,
            None,
            Some(json!({"ratio": 0.5})),
        );
        assert!(float.digest().is_err());

        let mut trail = AuditTrail::default();
        trail.append(a);
        trail.append(float);
        let digests = trail.compute_digests();
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0].0, 0);
    }

    #[test]
    fn drain_empties_trail() {
        let mut trail = AuditTrail::default();
        trail.append(entry(AuditEntryType::TriggerFailed, "alice"));
        assert_eq!(trail.drain().len(), 1);
        assert!(trail.is_empty());
    }

    #[test]
    fn entry_type_serializes_snake_case() {
        let json = serde_json::to_string(&AuditEntryType::TriggerSkipped).unwrap();
        assert_eq!(json, "\"trigger_skipped\"");
        assert_eq!(AuditEntryType::EventCreated.to_string(), "event_created");
    }
}
