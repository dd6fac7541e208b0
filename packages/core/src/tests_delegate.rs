use crate::data::Data;
use crate::delegate::{Change, Delegate};
use crate::model::Model;
use kontext_common::EventLoop;
use kontext_dom::{Document, Features};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn recorder() -> (Rc<RefCell<Vec<Change>>>, impl Fn(&Change) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |change: &Change| sink.borrow_mut().push(change.clone()))
}

#[test]
fn test_set_returns_prior_and_notifies_later() {
    let event_loop = EventLoop::new();
    let delegate = Delegate::new(&event_loop, 1);
    let (seen, handler) = recorder();
    delegate.on("update", handler);

    let prior = delegate.set(2);
    assert_eq!(prior, Data::from(1));
    assert_eq!(delegate.peek(), Data::from(2));
    assert!(seen.borrow().is_empty());

    event_loop.run_until_idle().unwrap();
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].value, Data::from(2));
    assert_eq!(seen[0].prior, Some(Data::from(1)));
}

#[test]
fn test_set_same_value_still_notifies() {
    let event_loop = EventLoop::new();
    let delegate = Delegate::new(&event_loop, "x");
    let (seen, handler) = recorder();
    delegate.on("update", handler);

    delegate.set("x");
    delegate.set("x");
    event_loop.run_until_idle().unwrap();
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn test_get_emits_access_and_peek_does_not() {
    let event_loop = EventLoop::new();
    let delegate = Delegate::new(&event_loop, true);
    let (seen, handler) = recorder();
    delegate.on("access", handler);

    assert_eq!(delegate.peek(), Data::from(true));
    event_loop.run_until_idle().unwrap();
    assert!(seen.borrow().is_empty());

    assert_eq!(delegate.get(), Data::from(true));
    event_loop.run_until_idle().unwrap();
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0].prior, None);
}

#[test]
fn test_scope_is_write_once() {
    let event_loop = EventLoop::new();
    let first = Model::new(&event_loop);
    let second = Model::new(&event_loop);
    let delegate = Delegate::new(&event_loop, 0);

    delegate.scope(Some(&first), Some("count"));
    delegate.scope(Some(&second), Some("other"));

    assert!(delegate.model().unwrap().ptr_eq(&first));
    assert_eq!(delegate.key().as_deref(), Some("count"));
}

#[test]
fn test_raw_json_is_promoted() {
    let event_loop = EventLoop::new();
    let delegate = Delegate::new(&event_loop, json!({"a": 1}));
    assert!(delegate.peek().as_model().is_some());

    delegate.set(json!([1, 2, 3]));
    let list = delegate.peek().as_list().cloned().unwrap();
    assert_eq!(list.len(), 3);
    assert!(list.owner().unwrap().ptr_eq(&delegate));
}

#[test]
fn test_element_writes_text_immediately() {
    let doc = Document::new(EventLoop::new());
    let node = doc.create_text("placeholder");
    let delegate = Delegate::new(doc.event_loop(), 42);

    let nodes = delegate.element([node.clone()]);
    assert_eq!(nodes, vec![node.clone()]);
    assert_eq!(node.data().as_deref(), Some("42"));

    let span = doc.create_element("span").with_text("old");
    delegate.element([span.clone()]);
    assert_eq!(span.text_content(), "42");
    assert_eq!(delegate.nodes().len(), 2);
}

#[test]
fn test_many_sets_sync_in_one_frame() {
    let doc = Document::new(EventLoop::new());
    let event_loop = doc.event_loop().clone();
    let node = doc.create_text("");
    let delegate = Delegate::new(&event_loop, "a");
    delegate.element([node.clone()]);

    delegate.set("b");
    delegate.set("c");
    delegate.set("d");
    event_loop.run_tasks().unwrap();

    assert_eq!(node.data().as_deref(), Some("a"));
    assert_eq!(event_loop.pending_frames(), 1);

    event_loop.run_frame();
    assert_eq!(node.data().as_deref(), Some("d"));
    assert_eq!(event_loop.pending_frames(), 0);
}

#[test]
fn test_external_edit_is_coerced_to_current_type() {
    let doc = Document::new(EventLoop::new());
    let event_loop = doc.event_loop().clone();
    let node = doc.create_text("");
    let delegate = Delegate::new(&event_loop, 12);
    delegate.element([node.clone()]);

    node.set_data("13").unwrap();
    event_loop.run_until_idle().unwrap();
    assert_eq!(delegate.peek(), Data::from(13));

    node.set_data("not a number").unwrap();
    event_loop.run_until_idle().unwrap();
    assert_eq!(delegate.peek(), Data::from(13));
    assert_eq!(node.data().as_deref(), Some("13"));
}

#[test]
fn test_queued_record_of_own_sync_does_not_revert_later_set() {
    let doc = Document::new(EventLoop::new());
    let event_loop = doc.event_loop().clone();
    let node = doc.create_text("");
    let delegate = Delegate::new(&event_loop, 5);
    delegate.element([node.clone()]);
    event_loop.run_until_idle().unwrap();

    delegate.set(7);
    event_loop.run_tasks().unwrap();
    event_loop.run_frame();
    assert_eq!(node.data().as_deref(), Some("7"));

    // The record for "7" is still queued when the next write lands
    delegate.set(8);
    event_loop.run_until_idle().unwrap();
    assert_eq!(delegate.peek(), Data::from(8));
    assert_eq!(node.data().as_deref(), Some("8"));

    node.set_data("9").unwrap();
    event_loop.run_until_idle().unwrap();
    assert_eq!(delegate.peek(), Data::from(9));
}

#[test]
fn test_external_edit_with_legacy_events() {
    let doc = Document::with_features(EventLoop::new(), Features::legacy());
    let event_loop = doc.event_loop().clone();
    let node = doc.create_text("");
    let delegate = Delegate::new(&event_loop, "hello");
    delegate.element([node.clone()]);

    node.set_data("world").unwrap();
    assert_eq!(delegate.peek(), Data::from("world"));
    event_loop.run_until_idle().unwrap();
    assert_eq!(node.data().as_deref(), Some("world"));
}

#[test]
fn test_notify_reemits_current_value() {
    let event_loop = EventLoop::new();
    let delegate = Delegate::new(&event_loop, 5);
    let (seen, handler) = recorder();
    delegate.on("update", handler);

    delegate.notify();
    event_loop.run_until_idle().unwrap();
    let seen = seen.borrow();
    assert_eq!(seen[0].value, Data::from(5));
    assert_eq!(seen[0].prior, Some(Data::from(5)));
}
