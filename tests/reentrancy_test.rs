//! Tests for mutations and subscriptions issued from inside notification handlers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use livedoc::{Document, Model, Notification, Subscription};
use parking_lot::Mutex;
use serde_json::json;

#[test]
fn test_set_inside_next_handler() {
    let doc = Document::new(json!({"*": {"type": "*"}})).unwrap();
    let fired = Arc::new(AtomicBool::new(false));
    let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));

    let handle = doc.clone();
    let once = Arc::clone(&fired);
    doc.subscribe(move |n: &Notification| {
        if n.is_next() && !once.swap(true, Ordering::SeqCst) {
            assert!(!handle.is_dirty());
            handle.set("valueD", json!(4)).unwrap();
        }
    });

    let probe = doc.clone();
    let sink = Arc::clone(&seen);
    doc.subscribe(move |n: &Notification| {
        assert!(n.is_next());
        sink.lock().push(probe.get("valueD").is_some());
    });

    doc.assign(json!({"valueA": 1, "valueB": 2, "valueC": 3}))
        .unwrap();

    assert_eq!(doc.get("valueD"), Some(json!(4)));
    // the nested set is delivered first, then the outer assignment
    assert_eq!(*seen.lock(), vec![true, true]);
    assert_eq!(doc.stats().notifications, 2);
}

#[test]
fn test_unsubscribe_and_resubscribe_inside_handler() {
    let doc = Document::new(json!({"*": {"type": "*"}})).unwrap();
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));
    let own: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let handle = doc.clone();
    let slot = Arc::clone(&own);
    let first = Arc::clone(&first_calls);
    let second = Arc::clone(&second_calls);
    let subscription = doc.subscribe(move |_: &Notification| {
        first.fetch_add(1, Ordering::SeqCst);
        if let Some(sub) = slot.lock().take() {
            sub.unsubscribe();
            let counter = Arc::clone(&second);
            handle.subscribe(move |_: &Notification| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
    });
    *own.lock() = Some(subscription.clone());

    doc.set("a", json!(1)).unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert!(!subscription.is_active());

    doc.set("b", json!(2)).unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nested_materialization_validates_whole_state_once() {
    let doc = Document::new(json!({
        "properties": {
            "profile": {
                "type": "Object",
                "properties": {
                    "name": {"type": "String"},
                    "links": {
                        "type": "Array",
                        "elements": {"type": "Object", "properties": {"url": {"type": "String"}}}
                    }
                }
            }
        }
    }))
    .unwrap();

    doc.assign(json!({
        "profile": {
            "name": "Ada",
            "links": [{"url": "a"}, {"url": "b"}]
        }
    }))
    .unwrap();

    let stats = doc.stats();
    assert_eq!(stats.whole_validations, 1);
    assert_eq!(stats.materializations, 4);
    assert_eq!(stats.notifications, 1);
}

#[test]
fn test_correction_from_error_handler() {
    let doc = Document::new(json!({"properties": {"count": {"type": "Integer"}}})).unwrap();

    let handle = doc.clone();
    doc.subscribe(move |n: &Notification| {
        if let Notification::Error { .. } = n {
            handle.set("count", json!(0)).unwrap();
        }
    });

    assert!(doc.set("count", json!("many")).is_err());
    assert_eq!(doc.get("count"), Some(json!(0)));
}
