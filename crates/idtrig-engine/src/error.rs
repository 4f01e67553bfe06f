//! # Trigger Errors
//!
//! The engine distinguishes three failure classes:
//!
//! - [`ConfigurationError`] means a trigger definition is unusable (unknown type
//!   name, missing attribute, missing rule). Fatal to that one trigger; the
//!   processor records it and moves on to the next trigger.
//! - [`RuleExecutionError`] means an injected rule, selector, or policy predicate
//!   failed. Never swallowed by the matcher.
//! - Filter coercion failures are *not* errors at this level: the filter
//!   simply does not match and a warning is logged.

use idtrig_core::IdtError;
use thiserror::Error;

use crate::definition::TriggerType;

/// Top-level error type for trigger matching and event construction.
#[derive(Error, Debug)]
pub enum TriggerError {
    /// The trigger definition is invalid.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An injected rule, selector, or predicate failed.
    #[error("rule execution error: {0}")]
    RuleExecution(#[from] RuleExecutionError),

    /// An event was requested for a trigger whose payload needs a snapshot
    /// the caller did not supply.
    #[error("trigger {trigger} ({trigger_type}) requires the {role} identity snapshot")]
    MissingSnapshot {
        /// Trigger identifier.
        trigger: String,
        /// Trigger type.
        trigger_type: TriggerType,
        /// `"previous"` or `"new"`.
        role: &'static str,
    },

    /// A referenced object could not be resolved.
    #[error("failed to resolve {kind} \"{key}\": {reason}")]
    Resolution {
        /// Object kind.
        kind: String,
        /// Identifier or name used for the lookup.
        key: String,
        /// Resolver message.
        reason: String,
    },

    /// Foundational type error.
    #[error(transparent)]
    Core(#[from] IdtError),
}

/// Invalid trigger configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The trigger type name is not one of the known variants.
    #[error("unknown trigger type \"{0}\"")]
    UnknownTriggerType(String),

    /// An attribute change trigger has no attribute name.
    #[error("trigger {trigger}: attribute change triggers require an attribute name")]
    MissingAttributeName {
        /// Trigger identifier.
        trigger: String,
    },

    /// An attribute name was configured on a type that does not use one, or
    /// a manager transfer trigger names an attribute other than the manager.
    #[error("trigger {trigger}: {trigger_type} triggers do not accept attribute \"{attribute}\"")]
    UnexpectedAttributeName {
        /// Trigger identifier.
        trigger: String,
        /// Trigger type.
        trigger_type: TriggerType,
        /// The rejected attribute name.
        attribute: String,
    },

    /// A rule trigger has no rule reference.
    #[error("trigger {trigger}: rule triggers require a rule reference")]
    MissingRule {
        /// Trigger identifier.
        trigger: String,
    },
}

/// Failure inside an injected collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleExecutionError {
    /// The referenced rule does not exist.
    #[error("rule \"{rule}\" not found")]
    RuleNotFound {
        /// Rule name.
        rule: String,
    },

    /// The rule ran and failed.
    #[error("rule \"{rule}\" failed: {reason}")]
    Failed {
        /// Rule name.
        rule: String,
        /// Failure description.
        reason: String,
    },

    /// Selector evaluation failed.
    #[error("selector evaluation failed: {reason}")]
    SelectorFailed {
        /// Failure description.
        reason: String,
    },

    /// A RapidSetup business-process predicate failed.
    #[error("predicate for business process \"{process}\" failed: {reason}")]
    PredicateFailed {
        /// Business process name.
        process: String,
        /// Failure description.
        reason: String,
    },
}
