//! # Attribute Values
//!
//! The runtime value of an identity attribute. Snapshots deserialize from
//! plain JSON (`"Sales"`, `42`, `true`, `["a", "b"]`), so the enum is
//! untagged. An attribute that is not set is represented by `Option::None`
//! at the call site, never by a variant here.

use serde::{Deserialize, Serialize};

use crate::error::CoercionError;

/// A typed identity attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag (e.g. `inactive`).
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Free text, including references such as a manager's name.
    String(String),
    /// Multi-valued attribute.
    List(Vec<AttributeValue>),
}

/// The runtime type of an [`AttributeValue`], used as a coercion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`AttributeValue::Bool`].
    Bool,
    /// [`AttributeValue::Integer`].
    Integer,
    /// [`AttributeValue::Float`].
    Float,
    /// [`AttributeValue::String`].
    String,
    /// [`AttributeValue::List`].
    List,
}

impl ValueKind {
    /// Lowercase type name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AttributeValue {
    /// Return the runtime type of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::List(_) => ValueKind::List,
        }
    }

    /// Convert `text` into a value of the same runtime type as `self`.
    ///
    /// Booleans follow the lenient rule used everywhere else in identity
    /// processing: `"true"` in any case is `true`, anything else is `false`.
    /// Lists have no string conversion.
    pub fn coerce_like(&self, text: &str) -> Result<AttributeValue, CoercionError> {
        Self::coerce_to(self.kind(), text)
    }

    /// Convert `text` into a value of the given kind.
    pub fn coerce_to(kind: ValueKind, text: &str) -> Result<AttributeValue, CoercionError> {
        match kind {
            ValueKind::String => Ok(Self::String(text.to_string())),
            ValueKind::Bool => Ok(Self::Bool(text.eq_ignore_ascii_case("true"))),
            ValueKind::Integer => {
                text.trim()
                    .parse::<i64>()
                    .map(Self::Integer)
                    .map_err(|e| CoercionError::Unparseable {
                        value: text.to_string(),
                        target: kind.as_str(),
                        reason: e.to_string(),
                    })
            }
            ValueKind::Float => {
                text.trim()
                    .parse::<f64>()
                    .map(Self::Float)
                    .map_err(|e| CoercionError::Unparseable {
                        value: text.to_string(),
                        target: kind.as_str(),
                        reason: e.to_string(),
                    })
            }
            ValueKind::List => Err(CoercionError::Unsupported {
                value: text.to_string(),
                target: kind.as_str(),
            }),
        }
    }

    /// Lenient boolean interpretation: `Bool(b)` is `b`, any other value is
    /// `true` only if its text form equals `"true"` ignoring case.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            other => other.to_string().eq_ignore_ascii_case("true"),
        }
    }

    /// Borrow the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value equals `text`, or (for a list) contains an element
    /// whose text form equals `text`.
    pub fn contains_text(&self, text: &str) -> bool {
        match self {
            Self::List(items) => items.iter().any(|v| v.contains_text(text)),
            other => other.to_string() == text,
        }
    }
}

/// Null-safe equality where two absent values are equal.
pub fn null_safe_eq(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}
