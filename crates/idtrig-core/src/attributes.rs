//! # Attributes
//!
//! A narrow, explicitly typed accessor over a string-keyed bag of
//! [`AttributeValue`]s. Used for identity attributes and trigger handler
//! parameters alike.
//!
//! The backing map is private. Callers read through `get`/`get_string`/
//! `get_bool` and write through `set`/`remove`, so type coercion stays here
//! and no consumer can reshape the map behind the owner's back.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::AttributeValue;

/// An ordered attribute bag.
///
/// Deserialization drops `null` entries: a JSON `null` and a missing key both
/// mean "not set".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    /// Create an empty attribute bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    /// Look up a value as a string. Non-string values are rendered with
    /// their display form; empty strings read as unset.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.entries.get(key)? {
            AttributeValue::String(s) if s.is_empty() => None,
            AttributeValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Look up a value as a boolean using lenient truthiness. Unset is `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(AttributeValue::is_truthy)
            .unwrap_or(false)
    }

    /// Set a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Option<AttributeValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a value, returning it if it was set.
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.entries.remove(key)
    }

    /// Whether `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of set attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate attribute names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<AttributeValue>>::deserialize(deserializer)?;
        Ok(Self {
            entries: raw
                .into_iter()
                .filter_map(|(k, v)| match v {
                    Some(v) => Some((k, v)),
                    None => {
                        tracing::trace!(attribute = %k, "dropping null attribute");
                        None
                    }
                })
                .collect(),
        })
    }
}
