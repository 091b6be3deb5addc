//! Property tests for identifier parsing.

use arco_nessie::identifier::{NamespaceIdentifier, TableIdentifier};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

fn branch() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}"
}

#[test]
fn feature_branch_identifier() {
    let table = TableIdentifier::parse("db.orders@feature-x").expect("parse");
    assert_eq!(table.namespace, vec!["db".to_string()]);
    assert_eq!(table.name, "orders");
    assert_eq!(table.branch.as_deref(), Some("feature-x"));
}

proptest! {
    #[test]
    fn table_identifier_round_trips(
        namespace in prop::collection::vec(segment(), 1..4),
        name in segment(),
        selected in prop::option::of(branch()),
    ) {
        let table = TableIdentifier::new(namespace.clone(), name.clone())
            .with_branch(selected.clone());
        let parsed = TableIdentifier::parse(table.to_string().as_str()).expect("parse");
        prop_assert_eq!(&parsed.namespace, &namespace);
        prop_assert_eq!(&parsed.name, &name);
        prop_assert_eq!(&parsed.branch, &selected);
        prop_assert_eq!(parsed, table);
    }

    #[test]
    fn namespace_identifier_round_trips(
        elements in prop::collection::vec(segment(), 1..4),
        selected in prop::option::of(branch()),
    ) {
        let namespace = NamespaceIdentifier { elements: elements.clone(), branch: selected.clone() };
        let parsed = NamespaceIdentifier::parse(namespace.to_string().as_str()).expect("parse");
        prop_assert_eq!(parsed.elements, elements);
        prop_assert_eq!(parsed.branch, selected);
    }

    #[test]
    fn content_key_path_round_trips(
        namespace in prop::collection::vec(segment(), 1..4),
        name in segment(),
    ) {
        let key = TableIdentifier::new(namespace, name).content_key().expect("key");
        let parsed = arco_core::ContentKey::parse_path(&key.to_path_string()).expect("parse");
        prop_assert_eq!(parsed, key);
    }
}
