//! End-to-end behavior of trigger matching and event construction.

use std::sync::Arc;

use idtrig_core::{
    AccountOperation, AttributeValue, Difference, IdentityName, IdentitySnapshot,
    NativeChangeDetection, TriggerId, MANAGER_ATTRIBUTE,
};
use idtrig_engine::{
    create_event, matches, matches_filters, BusinessProcessConfig, ChangePayload,
    MatchExpressionEvaluator, RuleBody, RuleLibrary, TriggerContext, TriggerDefinition,
    TriggerRegistry, TriggerType,
};
use proptest::prelude::*;

struct Env {
    registry: TriggerRegistry,
    selectors: MatchExpressionEvaluator,
    rules: RuleLibrary,
    processes: BusinessProcessConfig,
}

impl Env {
    fn new() -> Self {
        let rules = RuleLibrary::new().with_rule(
            "AlwaysTrueRule",
            RuleBody::Constant {
                value: AttributeValue::Bool(true),
            },
        );
        Self {
            registry: TriggerRegistry::default(),
            selectors: MatchExpressionEvaluator::with_rules(Arc::new(rules.clone())),
            rules,
            processes: BusinessProcessConfig::new(),
        }
    }

    fn ctx(&self) -> TriggerContext<'_> {
        TriggerContext::new(&self.registry, &self.selectors, &self.rules, &self.processes)
    }
}

fn identity(name: &str) -> IdentitySnapshot {
    IdentitySnapshot::new(IdentityName::new(name).unwrap())
}

fn trigger(t: TriggerType) -> TriggerDefinition {
    TriggerDefinition::new(TriggerId::new("trigger").unwrap(), t)
}

fn with_value(snapshot: IdentitySnapshot, attribute: &str, value: Option<&str>) -> IdentitySnapshot {
    match value {
        Some(v) => snapshot.with_attribute(attribute, v),
        None => snapshot,
    }
}

#[test]
fn department_moves_into_finance() {
    let env = Env::new();
    let def = trigger(TriggerType::AttributeChange)
        .with_attribute("department")
        .with_filters(None, Some("Finance"));
    let previous = identity("jdoe").with_attribute("department", "Sales");

    let new = identity("jdoe").with_attribute("department", "Finance");
    assert!(matches(&def, Some(&previous), Some(&new), &env.ctx()).unwrap());

    let new = identity("jdoe").with_attribute("department", "Marketing");
    assert!(!matches(&def, Some(&previous), Some(&new), &env.ctx()).unwrap());
}

#[test]
fn always_true_rule_matches_any_snapshots() {
    let env = Env::new();
    let def = trigger(TriggerType::Rule).with_rule("AlwaysTrueRule");
    let a = identity("a").with_attribute("x", "1");
    let b = identity("b");
    for (previous, new) in [
        (Some(&a), Some(&b)),
        (None, Some(&b)),
        (Some(&a), None),
        (None, None),
    ] {
        assert!(matches(&def, previous, new, &env.ctx()).unwrap());
    }
}

#[test]
fn create_event_wraps_new_identity_and_definition() {
    let def = trigger(TriggerType::Create);
    let new = identity("jdoe").with_create_pending().with_attribute("title", "Analyst");
    let event = create_event(&def, None, Some(&new)).unwrap().unwrap();
    assert_eq!(event.payload, ChangePayload::Created { identity: new });
    assert_eq!(event.trigger, def);
}

#[test]
fn native_change_uses_new_identity_even_when_its_list_is_empty() {
    let def = trigger(TriggerType::NativeChange);
    let change = NativeChangeDetection {
        application: Some("LDAP".into()),
        native_identity: Some("uid=jdoe".into()),
        operation: Some(AccountOperation::Modify),
        differences: vec![Difference::modified("mail", Some("a@x".into()), Some("b@x".into()))],
    };
    let previous = identity("jdoe").with_native_change(change);
    let new = identity("jdoe");

    // New identity present but empty: previous is not consulted.
    assert!(create_event(&def, Some(&previous), Some(&new)).unwrap().is_none());

    // New identity absent: previous is consulted.
    let event = create_event(&def, Some(&previous), None).unwrap().unwrap();
    match &event.payload {
        ChangePayload::NativeChangesDetected {
            identity_name,
            changes,
        } => {
            assert_eq!(identity_name.as_str(), "jdoe");
            assert_eq!(changes.len(), 1);
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(
        event.cause(),
        "Native [Modify] detected. Summary of changes [mail(Modified[a@x] to [b@x])]"
    );
}

fn value_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[a-c]{1,2}".prop_map(Some)]
}

fn filter_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), Just(Some(String::new())), "[a-c]{1,2}".prop_map(Some)]
}

proptest! {
    #[test]
    fn delete_matches_iff_new_absent(
        previous_present in any::<bool>(),
        new_present in any::<bool>(),
        attr in value_strategy(),
    ) {
        let env = Env::new();
        let def = trigger(TriggerType::Delete);
        let previous = with_value(identity("p"), "department", attr.as_deref());
        let new = identity("n");
        let result = matches(
            &def,
            previous_present.then_some(&previous),
            new_present.then_some(&new),
            &env.ctx(),
        )
        .unwrap();
        prop_assert_eq!(result, !new_present);
    }

    #[test]
    fn unfiltered_attribute_change_matches_iff_value_differs(
        old in value_strategy(),
        new in value_strategy(),
    ) {
        let env = Env::new();
        let def = trigger(TriggerType::AttributeChange).with_attribute("department");
        let previous = with_value(identity("a"), "department", old.as_deref());
        let current = with_value(identity("a"), "department", new.as_deref());
        let result = matches(&def, Some(&previous), Some(&current), &env.ctx()).unwrap();
        prop_assert_eq!(result, old != new);
    }

    #[test]
    fn filters_are_independent_per_side(
        old in value_strategy(),
        new in value_strategy(),
        old_filter in filter_strategy(),
        new_filter in filter_strategy(),
    ) {
        let old_v = old.map(AttributeValue::from);
        let new_v = new.map(AttributeValue::from);
        let both = matches_filters(old_v.as_ref(), new_v.as_ref(), old_filter.as_deref(), new_filter.as_deref());
        let old_side = matches_filters(old_v.as_ref(), None, old_filter.as_deref(), None);
        let new_side = matches_filters(None, new_v.as_ref(), None, new_filter.as_deref());
        prop_assert_eq!(both, old_side && new_side);
        prop_assert!(matches_filters(old_v.as_ref(), new_v.as_ref(), None, None));
    }

    #[test]
    fn manager_transfer_equals_attribute_change_on_manager(
        old in value_strategy(),
        new in value_strategy(),
        old_filter in filter_strategy(),
        new_filter in filter_strategy(),
    ) {
        let env = Env::new();
        let transfer = trigger(TriggerType::ManagerTransfer)
            .with_filters(old_filter.as_deref(), new_filter.as_deref());
        let change = trigger(TriggerType::AttributeChange)
            .with_attribute(MANAGER_ATTRIBUTE)
            .with_filters(old_filter.as_deref(), new_filter.as_deref());
        let previous = with_value(identity("a"), MANAGER_ATTRIBUTE, old.as_deref());
        let current = with_value(identity("a"), MANAGER_ATTRIBUTE, new.as_deref());
        prop_assert_eq!(
            matches(&transfer, Some(&previous), Some(&current), &env.ctx()).unwrap(),
            matches(&change, Some(&previous), Some(&current), &env.ctx()).unwrap()
        );
    }
}
