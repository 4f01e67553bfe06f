#![deny(missing_docs)]

//! # idtrig-core: Foundational Types for Identity Trigger Processing
//!
//! This crate defines the data every trigger consumer agrees on. It has no
//! internal crate dependencies, only `serde`, `serde_json`, `serde_jcs`,
//! `thiserror`, `sha2`, and `tracing` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Typed attribute values.** Identity attributes are an
//!    [`AttributeValue`] enum, not `Box<dyn Any>`. Filter coercion against the
//!    runtime type of a value lives in one place ([`AttributeValue::coerce_like`]).
//!
//! 2. **Narrow attribute access.** [`Attributes`] exposes `get`, `get_string`,
//!    `get_bool`, `set`, and `remove`. It does not hand out the underlying map.
//!
//! 3. **Validated identifiers.** [`TriggerId`] and [`IdentityName`] reject
//!    empty input at construction time.
//!
//! 4. **[`CanonicalBytes`] is the sole path to digest computation.** Audit
//!    entries are digested through `CanonicalBytes::new()` + [`sha256_digest`].
//!
//! 5. **[`IdtError`] hierarchy.** Structured errors with `thiserror`. No
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod attributes;
pub mod canonical;
pub mod csv;
pub mod digest;
pub mod error;
pub mod identity;
pub mod snapshot;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use attributes::Attributes;
pub use canonical::CanonicalBytes;
pub use csv::list_to_csv;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, CoercionError, IdtError, ValidationError};
pub use identity::{IdentityName, TriggerId};
pub use snapshot::{
    AccountOperation, Difference, IdentitySnapshot, NativeChangeDetection, MANAGER_ATTRIBUTE,
};
pub use value::{AttributeValue, ValueKind};
