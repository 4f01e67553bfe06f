//! # Error Hierarchy
//!
//! Structured error types shared by every identity trigger crate, built with
//! `thiserror`. No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Variants carry the offending input so operators can diagnose a bad trigger
//! definition or snapshot without re-running the refresh.

use thiserror::Error;

/// Top-level error type for the foundational crate.
#[derive(Error, Debug)]
pub enum IdtError {
    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Identifier validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A filter string could not be coerced to an attribute's type.
    #[error("coercion error: {0}")]
    Coercion(#[from] CoercionError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for identifier newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Trigger identifier is empty or whitespace.
    #[error("invalid trigger ID: must be non-empty")]
    EmptyTriggerId,

    /// Identity name is empty or whitespace.
    #[error("invalid identity name: must be non-empty")]
    EmptyIdentityName,
}

/// Failure to convert a configured filter string into the runtime type of
/// the attribute value it is compared against.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// The filter text does not parse as the target type.
    #[error("cannot coerce \"{value}\" to {target}: {reason}")]
    Unparseable {
        /// The filter text.
        value: String,
        /// Name of the target type.
        target: &'static str,
        /// Parser message.
        reason: String,
    },

    /// The target type has no conversion from a string.
    #[error("no string conversion to {target} for \"{value}\"")]
    Unsupported {
        /// The filter text.
        value: String,
        /// Name of the target type.
        target: &'static str,
    },
}
