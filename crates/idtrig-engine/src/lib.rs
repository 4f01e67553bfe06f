#![deny(missing_docs)]

//! # idtrig-engine: Identity Trigger Engine
//!
//! Decides which configured identity triggers fire when an identity is
//! refreshed, and builds the change events handed to downstream handlers.
//!
//! ## Components
//!
//! - **Registry** ([`registry`]): the closed set of [`TriggerType`]s with
//!   their static capability records and the RapidSetup inactivity check.
//!
//! - **Filter** ([`filter`]): literal old/new value filters, converted to
//!   the runtime type of the value they guard.
//!
//! - **Matcher** ([`matcher`]): selector gate followed by per-type matching.
//!
//! - **Events** ([`event`], [`cause`]): change event construction and
//!   human-readable cause text.
//!
//! - **Processor** ([`processor`]): runs every registered trigger against a
//!   refresh, isolating failures and recording an [`AuditTrail`].
//!
//! Rules, selectors, and RapidSetup predicates are injected through the
//! traits in [`context`]. [`RuleLibrary`] and [`BusinessProcessConfig`]
//! provide declarative implementations.

pub mod audit;
pub mod cause;
pub mod context;
pub mod definition;
pub mod error;
pub mod event;
pub mod filter;
pub mod matcher;
pub mod processor;
pub mod registry;
pub mod rules;
pub mod selector;

// Re-export primary types.
pub use audit::{AuditEntry, AuditEntryType, AuditTrail};
pub use cause::format_cause;
pub use context::{
    InMemoryResolver, ObjectKind, ObjectRef, PolicyPredicateEvaluator, Resolver, RuleExecutor,
    RuleParams, SelectorEvaluator, TriggerContext,
};
pub use definition::{HandlerParameters, RuleRef, TriggerDefinition, TriggerType};
pub use error::{ConfigurationError, RuleExecutionError, TriggerError};
pub use event::{create_event, ChangeEvent, ChangePayload};
pub use filter::matches_filters;
pub use matcher::{matches, MatchResult};
pub use processor::{SkipReason, TriggerProcessor, TriggerResult, TriggerStatus};
pub use registry::{AlwaysActive, Capabilities, InactivityCheck, TriggerRegistry};
pub use rules::{BusinessProcess, BusinessProcessConfig, RuleBody, RuleLibrary};
pub use selector::{IdentitySelector, MatchExpression, MatchExpressionEvaluator, MatchTerm};
