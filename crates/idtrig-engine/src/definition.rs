//! # Trigger Definitions
//!
//! A trigger definition decides when something happening to an identity is
//! interesting enough to hand to a downstream handler (a workflow, a
//! certification, a RapidSetup business process).
//!
//! Definitions are authored by administrators and are read-only to the
//! matcher. [`TriggerDefinition::validate`] enforces the per-type shape:
//!
//! - `AttributeChange` requires `attribute_name`.
//! - `ManagerTransfer` always watches [`MANAGER_ATTRIBUTE`]; naming any other
//!   attribute is rejected.
//! - Every other type rejects `attribute_name`.
//! - `Rule` requires a rule reference.

use std::str::FromStr;

use idtrig_core::{Attributes, AttributeValue, IdentitySnapshot, TriggerId, MANAGER_ATTRIBUTE};
use serde::{Deserialize, Serialize};

use crate::context::{ObjectKind, ObjectRef, Resolver, TriggerContext};
use crate::error::{ConfigurationError, TriggerError};
use crate::event::ChangeEvent;
use crate::registry::{Capabilities, TriggerRegistry};
use crate::selector::IdentitySelector;

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// The closed set of trigger variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerType {
    /// Identity was created and create processing is pending.
    Create,
    /// Identity was deleted.
    Delete,
    /// A named attribute changed value.
    AttributeChange,
    /// A custom rule decides.
    Rule,
    /// The manager attribute changed.
    ManagerTransfer,
    /// Native account changes were detected on a source system.
    NativeChange,
    /// Alert-driven; never matched during identity refresh.
    Alert,
    /// RapidSetup business-process trigger.
    RapidSetup,
}

impl TriggerType {
    /// Every variant, in declaration order.
    pub const ALL: [TriggerType; 8] = [
        Self::Create,
        Self::Delete,
        Self::AttributeChange,
        Self::Rule,
        Self::ManagerTransfer,
        Self::NativeChange,
        Self::Alert,
        Self::RapidSetup,
    ];

    /// Return the canonical type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Delete => "Delete",
            Self::AttributeChange => "AttributeChange",
            Self::Rule => "Rule",
            Self::ManagerTransfer => "ManagerTransfer",
            Self::NativeChange => "NativeChange",
            Self::Alert => "Alert",
            Self::RapidSetup => "RapidSetup",
        }
    }

    /// Human-readable label for UIs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Delete => "Delete",
            Self::AttributeChange => "Attribute Change",
            Self::Rule => "Rule",
            Self::ManagerTransfer => "Manager Transfer",
            Self::NativeChange => "Native Change",
            Self::Alert => "Alert",
            Self::RapidSetup => "RapidSetup",
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownTriggerType(s.to_string()))
    }
}

impl TryFrom<String> for TriggerType {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerType> for String {
    fn from(t: TriggerType) -> Self {
        t.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// RuleRef
// ---------------------------------------------------------------------------

/// Reference to a rule by name. Execution is delegated to a
/// [`RuleExecutor`](crate::context::RuleExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleRef {
    /// Rule name.
    pub name: String,
}

impl RuleRef {
    /// Reference a rule by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for RuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// HandlerParameters
// ---------------------------------------------------------------------------

/// Typed view over the parameters passed to a trigger's handler.
///
/// Well-known keys get dedicated accessors; anything else goes through
/// [`get_string`](Self::get_string), [`get_bool`](Self::get_bool), and
/// [`set`](Self::set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerParameters(Attributes);

impl HandlerParameters {
    /// Certification definition launched by the handler.
    pub const CERTIFICATION_DEFINITION_ID: &'static str = "certificationDefinitionId";
    /// Workflow launched by the handler.
    pub const WORKFLOW: &'static str = "workflow";
    /// RapidSetup business process (joiner, mover, leaver, ...).
    pub const BUSINESS_PROCESS: &'static str = "businessProcess";
    /// Maximum identities a single refresh may fire this trigger for.
    pub const IDENTITY_PROCESSING_THRESHOLD: &'static str = "identityProcessingThreshold";
    /// Unit of the threshold (`percentage` or `fixed`).
    pub const IDENTITY_PROCESSING_THRESHOLD_TYPE: &'static str = "identityProcessingThresholdType";

    /// Create empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a parameter as a string.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.0.get_string(key)
    }

    /// Read a parameter as a boolean. Unset is `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.0.get_bool(key)
    }

    /// Set a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.set(key, value);
    }

    /// Remove a parameter.
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Name of the workflow to launch.
    pub fn workflow_name(&self) -> Option<String> {
        self.get_string(Self::WORKFLOW)
    }

    /// Set the workflow to launch.
    pub fn set_workflow_name(&mut self, name: impl Into<String>) {
        self.set(Self::WORKFLOW, name.into());
    }

    /// Stop launching a workflow.
    pub fn clear_workflow(&mut self) {
        self.remove(Self::WORKFLOW);
    }

    /// Resolve the workflow by name.
    pub fn workflow(&self, resolver: &dyn Resolver) -> Result<Option<ObjectRef>, TriggerError> {
        match self.workflow_name() {
            Some(name) => resolver.object_by_name(ObjectKind::Workflow, &name),
            None => Ok(None),
        }
    }

    /// Identifier of the certification definition to launch.
    pub fn certification_definition_id(&self) -> Option<String> {
        self.get_string(Self::CERTIFICATION_DEFINITION_ID)
    }

    /// Set the certification definition to launch.
    pub fn set_certification_definition_id(&mut self, id: impl Into<String>) {
        self.set(Self::CERTIFICATION_DEFINITION_ID, id.into());
    }

    /// Resolve the certification definition by id.
    pub fn certification_definition(
        &self,
        resolver: &dyn Resolver,
    ) -> Result<Option<ObjectRef>, TriggerError> {
        match self.certification_definition_id() {
            Some(id) => resolver.object_by_id(ObjectKind::CertificationDefinition, &id),
            None => Ok(None),
        }
    }

    /// RapidSetup business process this trigger belongs to.
    pub fn match_process(&self) -> Option<String> {
        self.get_string(Self::BUSINESS_PROCESS)
    }

    /// Set the RapidSetup business process.
    pub fn set_match_process(&mut self, process: impl Into<String>) {
        self.set(Self::BUSINESS_PROCESS, process.into());
    }

    /// Identity processing threshold, as configured.
    pub fn identity_processing_threshold(&self) -> Option<String> {
        self.get_string(Self::IDENTITY_PROCESSING_THRESHOLD)
    }

    /// Set the identity processing threshold.
    pub fn set_identity_processing_threshold(&mut self, value: impl Into<String>) {
        self.set(Self::IDENTITY_PROCESSING_THRESHOLD, value.into());
    }

    /// Unit of the identity processing threshold.
    pub fn identity_processing_threshold_type(&self) -> Option<String> {
        self.get_string(Self::IDENTITY_PROCESSING_THRESHOLD_TYPE)
    }

    /// Set the unit of the identity processing threshold.
    pub fn set_identity_processing_threshold_type(&mut self, value: impl Into<String>) {
        self.set(Self::IDENTITY_PROCESSING_THRESHOLD_TYPE, value.into());
    }
}

// ---------------------------------------------------------------------------
// TriggerDefinition
// ---------------------------------------------------------------------------

/// An identity trigger as configured by an administrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    /// Unique trigger identifier.
    pub id: TriggerId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Trigger variant.
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Disabled triggers are never evaluated.
    #[serde(default)]
    pub disabled: bool,
    /// Owning identity.
    #[serde(default)]
    pub owner: Option<String>,
    /// Rule to run for `Rule` triggers.
    #[serde(default)]
    pub rule: Option<RuleRef>,
    /// Attribute watched by `AttributeChange` triggers.
    #[serde(default)]
    pub attribute_name: Option<String>,
    /// Literal the previous value must equal, if set.
    #[serde(default)]
    pub old_value_filter: Option<String>,
    /// Literal the new value must equal, if set.
    #[serde(default)]
    pub new_value_filter: Option<String>,
    /// Scopes which identities the trigger applies to.
    #[serde(default)]
    pub selector: Option<IdentitySelector>,
    /// Fully qualified name of the downstream handler.
    #[serde(default)]
    pub handler: Option<String>,
    /// Parameters passed to the handler.
    #[serde(default)]
    pub parameters: HandlerParameters,
}

impl TriggerDefinition {
    /// Create a definition with no filters, selector, or handler.
    pub fn new(id: TriggerId, trigger_type: TriggerType) -> Self {
        Self {
            id,
            name: None,
            description: None,
            trigger_type,
            disabled: false,
            owner: None,
            rule: None,
            attribute_name: None,
            old_value_filter: None,
            new_value_filter: None,
            selector: None,
            handler: None,
            parameters: HandlerParameters::new(),
        }
    }

    /// Builder: set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: set the watched attribute.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute_name = Some(attribute.into());
        self
    }

    /// Builder: set the old and new value filters.
    pub fn with_filters(mut self, old_value: Option<&str>, new_value: Option<&str>) -> Self {
        self.old_value_filter = old_value.map(String::from);
        self.new_value_filter = new_value.map(String::from);
        self
    }

    /// Builder: set the rule reference.
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(RuleRef::new(rule));
        self
    }

    /// Builder: set the selector.
    pub fn with_selector(mut self, selector: IdentitySelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Builder: set the handler.
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// Builder: set the RapidSetup business process.
    pub fn with_match_process(mut self, process: impl Into<String>) -> Self {
        self.parameters.set_match_process(process);
        self
    }

    /// Builder: disable the trigger.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Display name, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.id.as_str())
    }

    /// The attribute whose change this trigger watches.
    ///
    /// `ManagerTransfer` always watches [`MANAGER_ATTRIBUTE`]; other types
    /// that watch nothing return `None`.
    pub fn effective_attribute_name(&self) -> Option<&str> {
        match self.trigger_type {
            TriggerType::ManagerTransfer => Some(MANAGER_ATTRIBUTE),
            TriggerType::AttributeChange => self.attribute_name.as_deref(),
            TriggerType::Create
            | TriggerType::Delete
            | TriggerType::Rule
            | TriggerType::NativeChange
            | TriggerType::Alert
            | TriggerType::RapidSetup => None,
        }
    }

    /// Static capability record of this trigger's type.
    pub fn capabilities(&self) -> Capabilities {
        self.trigger_type.capabilities()
    }

    /// RapidSetup business process, if configured.
    pub fn match_process(&self) -> Option<String> {
        self.parameters.match_process()
    }

    /// Whether the registry reports this trigger inactive. Separate from
    /// [`disabled`](Self::disabled).
    pub fn is_inactive(&self, registry: &TriggerRegistry) -> bool {
        registry.is_inactive(self)
    }

    /// Check the per-type shape of this definition.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let attribute = self
            .attribute_name
            .as_deref()
            .filter(|a| !a.trim().is_empty());

        match self.trigger_type {
            TriggerType::AttributeChange => {
                if attribute.is_none() {
                    return Err(ConfigurationError::MissingAttributeName {
                        trigger: self.id.to_string(),
                    });
                }
            }
            TriggerType::ManagerTransfer => {
                if let Some(attr) = attribute.filter(|a| *a != MANAGER_ATTRIBUTE) {
                    return Err(self.unexpected_attribute(attr));
                }
            }
            TriggerType::Create
            | TriggerType::Delete
            | TriggerType::Rule
            | TriggerType::NativeChange
            | TriggerType::Alert
            | TriggerType::RapidSetup => {
                if let Some(attr) = attribute {
                    return Err(self.unexpected_attribute(attr));
                }
            }
        }

        if self.trigger_type == TriggerType::Rule && self.rule.is_none() {
            return Err(ConfigurationError::MissingRule {
                trigger: self.id.to_string(),
            });
        }
        Ok(())
    }

    fn unexpected_attribute(&self, attribute: &str) -> ConfigurationError {
        ConfigurationError::UnexpectedAttributeName {
            trigger: self.id.to_string(),
            trigger_type: self.trigger_type,
            attribute: attribute.to_string(),
        }
    }

    /// Whether the given snapshots match this trigger.
    ///
    /// See [`crate::matcher::matches`].
    pub fn matches(
        &self,
        previous: Option<&IdentitySnapshot>,
        new: Option<&IdentitySnapshot>,
        ctx: &TriggerContext<'_>,
    ) -> Result<bool, TriggerError> {
        crate::matcher::matches(self, previous, new, ctx)
    }

    /// Build the change event for a matched trigger.
    ///
    /// See [`crate::event::create_event`].
    pub fn create_event(
        &self,
        previous: Option<&IdentitySnapshot>,
        new: Option<&IdentitySnapshot>,
    ) -> Result<Option<ChangeEvent>, TriggerError> {
        crate::event::create_event(self, previous, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InMemoryResolver;

    fn id(s: &str) -> TriggerId {
        TriggerId::new(s).unwrap()
    }

    #[test]
    fn trigger_type_parses_case_insensitively() {
        assert_eq!("attributechange".parse::<TriggerType>().unwrap(), TriggerType::AttributeChange);
        assert_eq!(" RapidSetup ".parse::<TriggerType>().unwrap(), TriggerType::RapidSetup);
        assert_eq!(
            "Reorg".parse::<TriggerType>(),
            Err(ConfigurationError::UnknownTriggerType("Reorg".to_string()))
        );
    }

    #[test]
    fn trigger_type_round_trips_every_variant() {
        for t in TriggerType::ALL {
            assert_eq!(t.as_str().parse::<TriggerType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_type_in_json_is_rejected() {
        let err = serde_json::from_str::<TriggerDefinition>(r#"{"id": "x", "type": "Reorg"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown trigger type"));
    }

    #[test]
    fn deserializes_minimal_definition() {
        let def: TriggerDefinition = serde_json::from_str(
            r#"{"id": "dept", "type": "AttributeChange", "attribute_name": "department",
                "new_value_filter": "Finance", "parameters": {"workflow": "Mover"}}"#,
        )
        .unwrap();
        assert_eq!(def.trigger_type, TriggerType::AttributeChange);
        assert_eq!(def.new_value_filter.as_deref(), Some("Finance"));
        assert_eq!(def.parameters.workflow_name().as_deref(), Some("Mover"));
        assert!(!def.disabled);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn attribute_change_requires_attribute() {
        let def = TriggerDefinition::new(id("a"), TriggerType::AttributeChange);
        assert!(matches!(
            def.validate(),
            Err(ConfigurationError::MissingAttributeName { .. })
        ));
        assert!(def.with_attribute("department").validate().is_ok());
    }

    #[test]
    fn manager_transfer_attribute_is_fixed() {
        let def = TriggerDefinition::new(id("m"), TriggerType::ManagerTransfer);
        assert!(def.validate().is_ok());
        assert_eq!(def.effective_attribute_name(), Some(MANAGER_ATTRIBUTE));

        let explicit = def.clone().with_attribute(MANAGER_ATTRIBUTE);
        assert!(explicit.validate().is_ok());

        let other = def.with_attribute("department");
        assert!(matches!(
            other.validate(),
            Err(ConfigurationError::UnexpectedAttributeName { .. })
        ));
        assert_eq!(other.effective_attribute_name(), Some(MANAGER_ATTRIBUTE));
    }

    #[test]
    fn other_types_reject_attribute() {
        let def = TriggerDefinition::new(id("c"), TriggerType::Create).with_attribute("x");
        assert!(matches!(
            def.validate(),
            Err(ConfigurationError::UnexpectedAttributeName { .. })
        ));
    }

    #[test]
    fn rule_requires_rule_ref() {
        let def = TriggerDefinition::new(id("r"), TriggerType::Rule);
        assert!(matches!(def.validate(), Err(ConfigurationError::MissingRule { .. })));
        assert!(def.with_rule("AlwaysTrueRule").validate().is_ok());
    }

    #[test]
    fn handler_parameters_accessors() {
        let mut params = HandlerParameters::new();
        params.set_workflow_name("Joiner Workflow");
        params.set_certification_definition_id("cd-1");
        params.set_match_process("joiner");
        params.set_identity_processing_threshold("10");
        params.set_identity_processing_threshold_type("percentage");
        params.set("notify", true);

        assert_eq!(params.workflow_name().as_deref(), Some("Joiner Workflow"));
        assert_eq!(params.certification_definition_id().as_deref(), Some("cd-1"));
        assert_eq!(params.match_process().as_deref(), Some("joiner"));
        assert_eq!(params.identity_processing_threshold().as_deref(), Some("10"));
        assert_eq!(
            params.identity_processing_threshold_type().as_deref(),
            Some("percentage")
        );
        assert!(params.get_bool("notify"));

        params.clear_workflow();
        assert!(params.workflow_name().is_none());
    }

    #[test]
    fn handler_parameters_resolve_references() {
        let resolver = InMemoryResolver::new()
            .with(ObjectRef::new(ObjectKind::Workflow, "wf-1", "Joiner Workflow"))
            .with(ObjectRef::new(ObjectKind::CertificationDefinition, "cd-1", "Manager Cert"));

        let mut params = HandlerParameters::new();
        assert!(params.workflow(&resolver).unwrap().is_none());

        params.set_workflow_name("Joiner Workflow");
        params.set_certification_definition_id("cd-1");
        assert_eq!(params.workflow(&resolver).unwrap().unwrap().id, "wf-1");
        assert_eq!(
            params.certification_definition(&resolver).unwrap().unwrap().name,
            "Manager Cert"
        );
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let def = TriggerDefinition::new(id("leaver"), TriggerType::Delete);
        assert_eq!(def.display_name(), "leaver");
        assert_eq!(def.with_name("Leaver").display_name(), "Leaver");
    }
}
