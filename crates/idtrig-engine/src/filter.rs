//! # Attribute Value Filter
//!
//! Compares an observed old/new attribute value pair against the optional
//! literal filters on a trigger. A configured filter is converted to the
//! runtime type of the value it guards (or left a string when the value is
//! absent) and compared with null-safe equality. The two sides are
//! independent and the result is their conjunction.
//!
//! A filter that cannot be converted does not match. The failure is logged
//! and evaluation carries on.

use idtrig_core::value::null_safe_eq;
use idtrig_core::AttributeValue;
use tracing::warn;

/// Whether both sides of an attribute change satisfy their filters.
pub fn matches_filters(
    old_value: Option<&AttributeValue>,
    new_value: Option<&AttributeValue>,
    old_filter: Option<&str>,
    new_filter: Option<&str>,
) -> bool {
    side_matches("old", old_value, old_filter) && side_matches("new", new_value, new_filter)
}

/// The filter text, if set. Empty text and the literal `"null"` count as
/// unset.
pub fn configured(filter: Option<&str>) -> Option<&str> {
    filter.filter(|f| !f.is_empty() && *f != "null")
}

fn side_matches(side: &'static str, value: Option<&AttributeValue>, filter: Option<&str>) -> bool {
    let Some(filter) = configured(filter) else {
        return true;
    };
    let expected = match value {
        None => AttributeValue::String(filter.to_string()),
        Some(actual) => match actual.coerce_like(filter) {
            Ok(converted) => converted,
            Err(error) => {
                warn!(side, filter, %error, "filter value could not be converted; treating as no match");
                return false;
            }
        },
    };
    null_safe_eq(Some(&expected), value)
}
