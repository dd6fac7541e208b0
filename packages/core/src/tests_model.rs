use crate::data::Data;
use crate::delegate::{Change, Delegate};
use crate::error::KontextError;
use crate::model::Model;
use kontext_common::EventLoop;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn record_keys(model: &Model, label: &str, log: &Rc<RefCell<Vec<String>>>) {
    let log = log.clone();
    let label = label.to_string();
    model.on("update", move |change: &Change| {
        let key = change.key.clone().unwrap_or_default();
        log.borrow_mut().push(format!("{}:{}", label, key));
    });
}

#[test]
fn test_prepare_requires_an_object() {
    let event_loop = EventLoop::new();
    let err = Model::prepare(&event_loop, json!([1, 2])).unwrap_err();
    assert_eq!(err, KontextError::not_an_object("an array"));

    let model = Model::prepare(&event_loop, json!({"a": 1})).unwrap();
    let again = Model::prepare(&event_loop, &model).unwrap();
    assert!(again.ptr_eq(&model));
}

#[test]
fn test_snapshot_round_trips_nested_json() {
    let event_loop = EventLoop::new();
    let source = json!({
        "name": "Ada",
        "age": 36,
        "address": {"city": "London", "zip": null},
        "tags": ["math", {"kind": "engine"}]
    });
    let model = Model::prepare(&event_loop, source.clone()).unwrap();

    assert_eq!(model.snapshot(), source);
    assert_eq!(model.keys(), vec!["name", "age", "address", "tags"]);
    assert!(model.get("address").unwrap().as_model().is_some());
    assert!(model.get("tags").unwrap().as_list().is_some());
}

#[test]
fn test_updates_bubble_innermost_first() {
    let event_loop = EventLoop::new();
    let root = Model::prepare(&event_loop, json!({"a": {"b": {"c": 1}}})).unwrap();
    let a = root.get("a").unwrap().as_model().cloned().unwrap();
    let b = root.get("a.b").unwrap().as_model().cloned().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    record_keys(&root, "root", &log);
    record_keys(&a, "a", &log);
    record_keys(&b, "b", &log);

    assert!(root.set("a.b.c", 2));
    event_loop.run_until_idle().unwrap();

    assert_eq!(*log.borrow(), vec!["b:c", "a:b.c", "root:a.b.c"]);
    assert_eq!(root.snapshot(), json!({"a": {"b": {"c": 2}}}));
}

#[test]
fn test_delegation_is_strict() {
    let event_loop = EventLoop::new();
    let model = Model::prepare(&event_loop, json!({"a": 1, "m": {"x": true}})).unwrap();

    assert!(model.delegation("a").is_some());
    assert!(model.delegation("m.x").is_some());
    assert!(model.delegation("a.b").is_none());
    assert!(model.delegation("missing").is_none());
    assert!(model.delegation("m.y").is_none());

    assert!(!model.set("missing", 1));
    assert_eq!(model.get("missing"), None);
}

#[test]
fn test_define_is_idempotent() {
    let event_loop = EventLoop::new();
    let model = Model::new(&event_loop);

    let first = model.define("user.name", "Ada");
    let second = model.define("user.name", "Grace");
    assert!(first.ptr_eq(&second));
    assert_eq!(model.snapshot(), json!({"user": {"name": "Ada"}}));
}

#[test]
fn test_define_through_scalar_replaces_it_with_a_model() {
    let event_loop = EventLoop::new();
    let model = Model::prepare(&event_loop, json!({"x": 5})).unwrap();

    model.define("x.y", 1);
    assert_eq!(model.snapshot(), json!({"x": {"y": 1}}));
    event_loop.run_until_idle().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    record_keys(&model, "root", &log);
    model.set("x.y", 2);
    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["root:x.y"]);
}

#[test]
fn test_insert_replaces_previous_delegate() {
    let event_loop = EventLoop::new();
    let model = Model::new(&event_loop);
    let old = model.insert("k", Delegate::new(&event_loop, 1));
    let new = model.insert("k", Delegate::new(&event_loop, 2));

    let log = Rc::new(RefCell::new(Vec::new()));
    record_keys(&model, "m", &log);

    old.set(10);
    event_loop.run_until_idle().unwrap();
    assert!(log.borrow().is_empty());

    new.set(20);
    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["m:k"]);
    assert_eq!(model.snapshot(), json!({"k": 20}));
}

#[test]
fn test_list_item_changes_notify_the_owning_key() {
    let event_loop = EventLoop::new();
    let model = Model::prepare(&event_loop, json!({"items": [{"n": 1}]})).unwrap();
    let list = model.get("items").unwrap().as_list().cloned().unwrap();
    let item = list.get(0).unwrap().as_model().cloned().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    record_keys(&model, "root", &log);

    item.set("n", 2);
    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["root:items"]);

    log.borrow_mut().clear();
    list.push(json!({"n": 3}));
    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["root:items"]);
    assert_eq!(model.snapshot(), json!({"items": [{"n": 2}, {"n": 3}]}));
}

#[test]
fn test_replaced_submodel_stops_bubbling() {
    let event_loop = EventLoop::new();
    let model = Model::prepare(&event_loop, json!({"child": {"v": 1}})).unwrap();
    let detached = model.get("child").unwrap().as_model().cloned().unwrap();

    model.set("child", json!({"v": 2}));
    event_loop.run_until_idle().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    record_keys(&model, "root", &log);
    detached.set("v", 3);
    event_loop.run_until_idle().unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(model.get("child.v"), Some(Data::from(2)));
}

#[test]
fn test_self_referencing_model_publishes_once() {
    let event_loop = EventLoop::new();
    let model = Model::prepare(&event_loop, json!({"a": 1})).unwrap();
    model.define("me", Data::Model(model.clone()));
    event_loop.run_until_idle().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    record_keys(&model, "root", &log);
    model.set("a", 2);
    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["root:a"]);
}

#[test]
fn test_mutually_nested_models_stop_at_the_cycle() {
    let event_loop = EventLoop::new();
    let a = Model::prepare(&event_loop, json!({})).unwrap();
    let b = Model::prepare(&event_loop, json!({"x": 1})).unwrap();
    a.define("b", Data::Model(b.clone()));
    b.define("a", Data::Model(a.clone()));
    event_loop.run_until_idle().unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    record_keys(&a, "a", &log);
    record_keys(&b, "b", &log);
    b.set("x", 2);
    event_loop.run_until_idle().unwrap();
    assert_eq!(*log.borrow(), vec!["b:x", "a:b.x"]);
}
