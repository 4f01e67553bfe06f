//! Comma-separated rendering for diagnostic text.

/// Join `items` with `", "`. Items containing a comma or a double quote are
/// wrapped in double quotes with embedded quotes doubled. An empty list
/// renders as `None`.
pub fn list_to_csv<S: AsRef<str>>(items: &[S]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let rendered: Vec<String> = items
        .iter()
        .map(|item| {
            let s = item.as_ref();
            if s.contains(',') || s.contains('"') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.to_string()
            }
        })
        .collect();
    Some(rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_none() {
        let empty: [&str; 0] = [];
        assert_eq!(list_to_csv(&empty), None);
    }

    #[test]
    fn joins_with_space() {
        assert_eq!(list_to_csv(&["a", "b"]).as_deref(), Some("a, b"));
    }

    proptest::proptest! {
        #[test]
        fn plain_items_join_unquoted(items in proptest::collection::vec("[a-z0-9 ]{0,6}", 1..6)) {
            proptest::prop_assert_eq!(list_to_csv(&items), Some(items.join(", ")));
        }

        #[test]
        fn items_with_commas_are_quoted(head in "[a-z]{1,4}", tail in "[a-z]{1,4}") {
            let item = format!("{head},{tail}");
            let rendered = list_to_csv(&[item.as_str(), "x"]).unwrap();
            proptest::prop_assert_eq!(rendered, format!("\"{item}\", x"));
        }
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(
            list_to_csv(&["cn=x,ou=y", "plain", "say \"hi\""]).as_deref(),
            Some(r#""cn=x,ou=y", plain, "say ""hi""""#)
        );
    }
}
