use crate::*;
use kontext_common::EventLoop;
use std::cell::RefCell;
use std::rc::Rc;

fn document() -> Document {
    Document::new(EventLoop::new())
}

#[test]
fn test_fresh_document_structure() {
    let doc = document();
    let html = doc.document_element();
    assert_eq!(html.tag_name().as_deref(), Some("html"));
    assert_eq!(html.children(), vec![doc.head(), doc.body()]);
    assert!(doc.body().is_connected());
}

#[test]
fn test_builders_and_text_content() {
    let doc = document();
    let list = doc
        .create_element("UL")
        .with_attr("class", "items")
        .with_child(doc.create_element("li").with_text("one"))
        .with_child(doc.create_element("li").with_text("two"));
    doc.body().append_child(&list).unwrap();

    assert_eq!(list.tag_name().as_deref(), Some("ul"));
    assert_eq!(list.text_content(), "onetwo");
    assert_eq!(list.children().len(), 2);
    assert!(doc.body().contains(&list.children()[1]));
}

#[test]
fn test_append_moves_node() {
    let doc = document();
    let a = doc.create_element("div");
    let b = doc.create_element("div");
    let child = doc.create_element("span");

    a.append_child(&child).unwrap();
    b.append_child(&child).unwrap();

    assert!(a.children().is_empty());
    assert_eq!(child.parent(), Some(b));
}

#[test]
fn test_cycle_rejected() {
    let doc = document();
    let outer = doc.create_element("div");
    let inner = doc.create_element("div");
    outer.append_child(&inner).unwrap();

    assert!(matches!(
        inner.append_child(&outer),
        Err(DomError::HierarchyRequest { .. })
    ));
    assert!(matches!(
        outer.append_child(&outer),
        Err(DomError::HierarchyRequest { .. })
    ));
}

#[test]
fn test_insert_before_and_replace_with() {
    let doc = document();
    let parent = doc.create_element("div");
    let first = doc.create_text("a");
    let last = doc.create_text("c");
    parent.append_child(&first).unwrap();
    parent.append_child(&last).unwrap();

    let middle = doc.create_text("b");
    parent.insert_before(&middle, Some(&last)).unwrap();
    assert_eq!(parent.text_content(), "abc");

    let marker = doc.create_comment("marker");
    middle.replace_with(&marker).unwrap();
    assert_eq!(parent.children(), vec![first, marker, last]);
    assert!(middle.parent().is_none());
}

#[test]
fn test_clone_node_deep() {
    let doc = document();
    let template = doc
        .create_element("li")
        .with_attr("data-kontext", "text: name")
        .with_text("{name}");

    let copy = template.clone_node(true);
    assert_ne!(copy, template);
    assert_eq!(copy.attribute("data-kontext").as_deref(), Some("text: name"));
    assert_eq!(copy.text_content(), "{name}");

    let shallow = template.clone_node(false);
    assert!(shallow.children().is_empty());
}

#[test]
fn test_query_selector_all() {
    let doc = document();
    let section = doc
        .create_element("section")
        .with_attr("id", "main")
        .with_child(doc.create_element("p").with_attr("class", "note first"))
        .with_child(
            doc.create_element("div")
                .with_child(doc.create_element("p").with_attr("data-kontext", "x: 1")),
        );
    doc.body().append_child(&section).unwrap();

    assert_eq!(doc.query_selector_all("p").unwrap().len(), 2);
    assert_eq!(doc.query_selector_all("#main p.note").unwrap().len(), 1);
    assert_eq!(doc.query_selector_all("[data-kontext]").unwrap().len(), 1);
    assert_eq!(doc.query_selector_all("section div p").unwrap().len(), 1);
    assert_eq!(section.query_selector_all("section").unwrap().len(), 0);
    assert_eq!(doc.get_element_by_id("main"), Some(section));
}

#[test]
fn test_native_observer_is_queued() {
    let event_loop = EventLoop::new();
    let doc = Document::new(event_loop.clone());
    let text = doc.create_text("5");
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&seen);
    assert!(text.observe_character_data(move |record| {
        sink.borrow_mut()
            .push((record.old_value.clone(), record.value.clone()));
    }));

    text.set_data("12").unwrap();
    assert!(seen.borrow().is_empty());

    event_loop.run_tasks().unwrap();
    assert_eq!(*seen.borrow(), vec![("5".to_string(), "12".to_string())]);
}

#[test]
fn test_legacy_mutation_event_is_synchronous() {
    let event_loop = EventLoop::new();
    let doc = Document::with_features(event_loop.clone(), Features::legacy());
    let holder = doc.create_element("span");
    let text = doc.create_text("on");
    holder.append_child(&text).unwrap();

    assert!(!text.observe_character_data(|_| {}));

    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    holder
        .add_event_listener(CHARACTER_DATA_MODIFIED, move |event| {
            *sink.borrow_mut() = event.new_value.clone();
        })
        .unwrap();

    text.set_data("off").unwrap();
    assert_eq!(seen.borrow().as_deref(), Some("off"));
    assert_eq!(event_loop.pending_tasks(), 0);
}

#[test]
fn test_unobservable_document() {
    let doc = Document::with_features(EventLoop::new(), Features::unobservable());
    let text = doc.create_text("x");
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    text.add_event_listener(CHARACTER_DATA_MODIFIED, move |_| *sink.borrow_mut() += 1);

    text.set_data("y").unwrap();
    assert_eq!(*count.borrow(), 0);
    assert_eq!(text.data().as_deref(), Some("y"));
}

#[test]
fn test_remove_event_listener() {
    let doc = document();
    let button = doc.create_element("button");
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    let id = button
        .add_event_listener("click", move |_| *sink.borrow_mut() += 1)
        .unwrap();

    assert_eq!(button.dispatch_event("click"), 1);
    assert!(button.remove_event_listener(id));
    assert_eq!(button.dispatch_event("click"), 0);
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_set_text_content_on_element() {
    let doc = document();
    let div = doc.create_element("div").with_text("a").with_text("b");
    div.set_text_content("replaced");
    assert_eq!(div.children().len(), 1);
    assert_eq!(div.text_content(), "replaced");

    assert!(matches!(
        div.set_data("nope"),
        Err(DomError::NotCharacterData { .. })
    ));
}
