//! # Collaborators
//!
//! The engine performs no I/O. Everything it needs from the outside world
//! arrives through the traits in this module:
//!
//! - [`Resolver`] loads referenced objects (workflows, certification
//!   definitions, applications) by id or name.
//! - [`RuleExecutor`] runs a named rule.
//! - [`SelectorEvaluator`] decides whether an identity is in a trigger's scope.
//! - [`PolicyPredicateEvaluator`] decides RapidSetup triggers.
//!
//! All collaborators are synchronous and `Send + Sync`; a hang inside one is
//! the caller's concern.

use std::collections::BTreeMap;

use idtrig_core::{AttributeValue, IdentitySnapshot};
use serde::{Deserialize, Serialize};

use crate::definition::{RuleRef, TriggerDefinition};
use crate::error::{RuleExecutionError, TriggerError};
use crate::registry::TriggerRegistry;
use crate::selector::IdentitySelector;

/// Kinds of object a [`Resolver`] can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A workflow launched by a trigger handler.
    Workflow,
    /// A certification definition launched by a trigger handler.
    CertificationDefinition,
    /// A source application.
    Application,
    /// An identity.
    Identity,
    /// A rule.
    Rule,
}

impl ObjectKind {
    /// Return the kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::CertificationDefinition => "certification_definition",
            Self::Application => "application",
            Self::Identity => "identity",
            Self::Rule => "rule",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved reference to an external object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object kind.
    pub kind: ObjectKind,
    /// Persistent identifier.
    pub id: String,
    /// Unique name.
    pub name: String,
}

impl ObjectRef {
    /// Create a reference.
    pub fn new(kind: ObjectKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Loads objects by id or name. `Ok(None)` means the object does not exist.
pub trait Resolver: Send + Sync {
    /// Load an object by persistent identifier.
    fn object_by_id(&self, kind: ObjectKind, id: &str) -> Result<Option<ObjectRef>, TriggerError>;

    /// Load an object by unique name.
    fn object_by_name(
        &self,
        kind: ObjectKind,
        name: &str,
    ) -> Result<Option<ObjectRef>, TriggerError>;
}

/// Resolver backed by an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    objects: BTreeMap<(ObjectKind, String), ObjectRef>,
}

impl InMemoryResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add an object.
    pub fn with(mut self, object: ObjectRef) -> Self {
        self.insert(object);
        self
    }

    /// Add an object, replacing any with the same kind and id.
    pub fn insert(&mut self, object: ObjectRef) {
        self.objects.insert((object.kind, object.id.clone()), object);
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the resolver holds nothing.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Resolver for InMemoryResolver {
    fn object_by_id(&self, kind: ObjectKind, id: &str) -> Result<Option<ObjectRef>, TriggerError> {
        Ok(self.objects.get(&(kind, id.to_string())).cloned())
    }

    fn object_by_name(
        &self,
        kind: ObjectKind,
        name: &str,
    ) -> Result<Option<ObjectRef>, TriggerError> {
        Ok(self
            .objects
            .values()
            .find(|o| o.kind == kind && o.name == name)
            .cloned())
    }
}

/// Parameters handed to a rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleParams<'a> {
    /// Identity before refresh, if any.
    pub previous: Option<&'a IdentitySnapshot>,
    /// Identity after refresh, if any. For selector rules this is the
    /// identity being scoped.
    pub new: Option<&'a IdentitySnapshot>,
    /// The trigger being evaluated, when the rule runs on behalf of one.
    pub trigger: Option<&'a TriggerDefinition>,
}

/// Runs named rules.
pub trait RuleExecutor: Send + Sync {
    /// Run `rule`. `Ok(None)` is a rule that returned nothing.
    fn run_rule(
        &self,
        rule: &RuleRef,
        params: &RuleParams<'_>,
    ) -> Result<Option<AttributeValue>, RuleExecutionError>;
}

/// Decides whether an identity falls inside a selector's scope.
pub trait SelectorEvaluator: Send + Sync {
    /// `true` if `identity` is selected.
    fn is_match(
        &self,
        selector: &IdentitySelector,
        identity: &IdentitySnapshot,
    ) -> Result<bool, RuleExecutionError>;
}

/// Decides RapidSetup triggers.
pub trait PolicyPredicateEvaluator: Send + Sync {
    /// `true` if the trigger's business process condition holds.
    fn evaluate(
        &self,
        definition: &TriggerDefinition,
        new: Option<&IdentitySnapshot>,
        previous: Option<&IdentitySnapshot>,
    ) -> Result<bool, RuleExecutionError>;
}

/// Everything the matcher borrows for one evaluation.
#[derive(Clone, Copy)]
pub struct TriggerContext<'a> {
    /// Type registry and inactivity check.
    pub registry: &'a TriggerRegistry,
    /// Selector evaluation.
    pub selectors: &'a dyn SelectorEvaluator,
    /// Rule execution.
    pub rules: &'a dyn RuleExecutor,
    /// RapidSetup predicate evaluation.
    pub predicates: &'a dyn PolicyPredicateEvaluator,
}

impl<'a> TriggerContext<'a> {
    /// Bundle collaborators.
    pub fn new(
        registry: &'a TriggerRegistry,
        selectors: &'a dyn SelectorEvaluator,
        rules: &'a dyn RuleExecutor,
        predicates: &'a dyn PolicyPredicateEvaluator,
    ) -> Self {
        Self {
            registry,
            selectors,
            rules,
            predicates,
        }
    }
}

impl std::fmt::Debug for TriggerContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerContext")
            .field("registry", self.registry)
            .finish_non_exhaustive()
    }
}
