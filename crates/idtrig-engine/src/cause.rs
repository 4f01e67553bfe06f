//! Human-readable cause text for change events.
//!
//! The text is diagnostic and audit output only. Nothing parses it.

use idtrig_core::{list_to_csv, AttributeValue, Difference, IdentitySnapshot, NativeChangeDetection};

use crate::definition::TriggerType;
use crate::event::ChangeEvent;

/// Summarize why `event`'s trigger fired.
pub fn format_cause(event: &ChangeEvent) -> String {
    let trigger = &event.trigger;
    match trigger.trigger_type {
        TriggerType::Create => "Identity created".to_string(),
        TriggerType::Delete => "Identity deleted".to_string(),
        TriggerType::AttributeChange | TriggerType::ManagerTransfer => {
            let attribute = trigger.effective_attribute_name().unwrap_or_default();
            format!(
                "Attribute '{attribute}' changed from {} to {}",
                render(event.payload.previous(), attribute),
                render(event.payload.new_identity(), attribute),
            )
        }
        TriggerType::Rule => format!(
            "Rule '{}' matched",
            trigger.rule.as_ref().map_or("unspecified", |r| r.name.as_str())
        ),
        TriggerType::RapidSetup => format!(
            "RapidSetup trigger matched for {}",
            trigger
                .match_process()
                .unwrap_or_else(|| "unspecified process".to_string())
        ),
        TriggerType::NativeChange => native_summary(event.payload.native_changes()),
        TriggerType::Alert => "Alert Matched".to_string(),
    }
}

fn render(identity: Option<&IdentitySnapshot>, attribute: &str) -> String {
    identity
        .and_then(|i| i.attribute(attribute))
        .map_or_else(|| "null".to_string(), AttributeValue::to_string)
}

fn native_summary(changes: &[NativeChangeDetection]) -> String {
    let mut operations: Vec<String> = Vec::new();
    let mut summaries: Vec<String> = Vec::new();
    let mut saw_attribute = false;

    for change in changes {
        push_unique(&mut operations, change.effective_operation().to_string());
        for diff in &change.differences {
            let Some(attribute) = diff.attribute.as_deref() else {
                continue;
            };
            saw_attribute = true;
            push_unique(&mut summaries, describe(attribute, diff));
        }
    }

    if !saw_attribute {
        return "Native changes were detected.".to_string();
    }
    format!(
        "Native [{}] detected. Summary of changes [{}]",
        list_to_csv(&operations).unwrap_or_default(),
        list_to_csv(&summaries).unwrap_or_default(),
    )
}

fn describe(attribute: &str, diff: &Difference) -> String {
    match (diff.added_values_csv(), diff.removed_values_csv()) {
        (None, None) => format!(
            "{attribute}(Modified[{}] to [{}])",
            diff.old_value.as_deref().unwrap_or_default(),
            diff.new_value.as_deref().unwrap_or_default(),
        ),
        (Some(added), None) => format!("{attribute}(Added=[{added}])"),
        (None, Some(removed)) => format!("{attribute}(Removed=[{removed}])"),
        (Some(added), Some(removed)) => {
            format!("{attribute}(Added=[{added}],Removed=[{removed}])")
        }
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
