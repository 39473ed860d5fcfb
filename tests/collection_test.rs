//! Tests for ordered collection nodes.

use std::sync::Arc;

use livedoc::{CollectionNode, Document, Model, MutationError, Notification};
use parking_lot::Mutex;
use serde_json::json;

fn rows_document() -> Document {
    Document::new(json!({
        "properties": {
            "rows": {
                "type": "Array",
                "elements": {
                    "type": "Object",
                    "properties": {"id": {"type": "Integer", "required": true}}
                }
            }
        }
    }))
    .unwrap()
}

fn rows(doc: &Document) -> CollectionNode {
    doc.child("rows").unwrap().as_collection().unwrap().clone()
}

#[test]
fn test_list_value_materializes_collection() {
    let doc = rows_document();
    doc.set("rows", json!([{"id": 1}])).unwrap();

    let rows = rows(&doc);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.path().to_string(), "rows");
    assert_eq!(rows.get("0.id"), Some(json!(1)));
    assert_eq!(doc.get("rows.0.id"), Some(json!(1)));
}

#[test]
fn test_push_validates_whole_list() {
    let doc = rows_document();
    doc.set("rows", json!([{"id": 1}])).unwrap();
    let rows = rows(&doc);

    rows.push(json!({"id": 2})).unwrap();
    assert_eq!(rows.len(), 2);

    let err = rows.push(json!({})).unwrap_err();
    assert_eq!(err.to_string(), "'rows.2.id' is required");
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_set_index_replaces_and_appends() {
    let doc = rows_document();
    doc.set("rows", json!([{"id": 1}])).unwrap();
    let rows = rows(&doc);

    rows.set("0", json!({"id": 5})).unwrap();
    rows.set("1", json!({"id": 6})).unwrap();
    assert_eq!(doc.get("rows"), Some(json!([{"id": 5}, {"id": 6}])));

    let err = rows.set("3", json!({"id": 7})).unwrap_err();
    assert_eq!(err.to_string(), "element 'rows.3' is not a valid element");

    let err = rows.set("name", json!(1)).unwrap_err();
    assert!(matches!(err, MutationError::Rejected { .. }));
}

#[test]
fn test_nested_item_update_through_dotted_key() {
    let doc = rows_document();
    doc.set("rows", json!([{"id": 1}, {"id": 2}])).unwrap();

    doc.set("rows.1.id", json!(20)).unwrap();
    assert_eq!(doc.get("rows.1.id"), Some(json!(20)));

    let err = doc.set("rows.1.id", json!("x")).unwrap_err();
    assert_eq!(err.to_string(), "'rows.1.id' expected integer, type was '<string>'");
}

#[test]
fn test_delete_shifts_items() {
    let doc = rows_document();
    doc.set("rows", json!([{"id": 1}, {"id": 2}, {"id": 3}])).unwrap();
    let rows = rows(&doc);

    rows.delete("0").unwrap();
    assert_eq!(doc.get("rows"), Some(json!([{"id": 2}, {"id": 3}])));

    let first = rows.child("0").unwrap();
    assert_eq!(first.path().to_string(), "rows.0");
    first.set("id", json!(9)).unwrap();
    assert_eq!(doc.get("rows.0.id"), Some(json!(9)));

    assert!(rows.delete("7").is_ok());
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_whole_list_assignment() {
    let doc = rows_document();
    doc.set("rows", json!([{"id": 1}])).unwrap();
    let rows = rows(&doc);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    doc.subscribe(move |n: &Notification| sink.lock().push(n.clone()));

    rows.assign(json!([{"id": 7}, {"id": 8}, {"id": 9}])).unwrap();
    assert_eq!(rows.len(), 3);

    let err = rows.assign(json!([{"id": 1}, {"id": "two"}])).unwrap_err();
    assert_eq!(err.to_string(), "'rows.1.id' expected integer, type was '<string>'");
    assert_eq!(rows.len(), 3);

    assert!(matches!(
        rows.assign(json!({"id": 1})),
        Err(MutationError::NotComposite { expected: "array", .. })
    ));

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].is_next());
    assert_eq!(seen[0].path().to_string(), "rows");
    assert!(!seen[1].is_next());
}

#[test]
fn test_frozen_collection() {
    let doc = rows_document();
    doc.set("rows", json!([{"id": 1}])).unwrap();
    let rows = rows(&doc);

    rows.freeze();
    assert!(matches!(rows.push(json!({"id": 2})), Err(MutationError::Frozen { .. })));
    assert!(matches!(rows.delete("0"), Err(MutationError::Frozen { .. })));
    assert!(matches!(rows.delete("name"), Err(MutationError::Frozen { .. })));
    assert!(matches!(rows.delete("9"), Err(MutationError::Frozen { .. })));
    assert!(matches!(doc.set("rows.0.id", json!(3)), Err(MutationError::Frozen { .. })));
    assert!(!doc.is_frozen());
}

#[test]
fn test_untyped_list_accepts_mixed_items() {
    let doc = Document::new(json!({"properties": {"bag": {"type": "Array"}}})).unwrap();

    doc.set("bag", json!([1, "two", null, {"four": 4}, [5]])).unwrap();
    assert_eq!(doc.get("bag.3.four"), Some(json!(4)));
    assert_eq!(doc.get("bag.4.0"), Some(json!(5)));
}
