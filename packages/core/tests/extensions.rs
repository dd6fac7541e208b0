//! Built-in extensions: text, conditional and each

use kontext::{Data, Document, EventLoop, Kontext, KontextError, Node, Settings};
use kontext_condition::ConditionError;
use serde_json::json;

fn setup() -> (Document, Kontext) {
    let doc = Document::new(EventLoop::new());
    let kontext = Kontext::new(&doc);
    (doc, kontext)
}

/// Rendered elements, without the comment anchors of `each`
fn items(element: &Node) -> Vec<Node> {
    element.children().into_iter().filter(Node::is_element).collect()
}

fn texts(element: &Node) -> Vec<String> {
    items(element).iter().map(Node::text_content).collect()
}

// ----------------------------------------------------------------------
// text
// ----------------------------------------------------------------------

#[test]
fn test_text_attribute_binds_element_content() {
    let (doc, kontext) = setup();
    let heading = doc.create_element("h1").with_attr("data-kontext", "text: title");
    doc.body().append_child(&heading).unwrap();

    let model = kontext.bind(json!({"title": "Draft"}), [&heading], None).unwrap();
    assert_eq!(heading.text_content(), "Draft");

    model.set("title", "Final");
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(heading.text_content(), "Final");
}

#[test]
fn test_text_defines_missing_keys_with_initial_value() {
    let (doc, kontext) = setup();
    let paragraph = doc.create_element("p").with_text("{count:3} items, {label}");
    doc.body().append_child(&paragraph).unwrap();

    let model = kontext.bind(json!({}), [&paragraph], None).unwrap();
    assert_eq!(model.snapshot(), json!({"count": 3, "label": ""}));
    assert_eq!(paragraph.text_content(), "3 items, ");
}

#[test]
fn test_text_initial_value_does_not_override_existing_data() {
    let (doc, kontext) = setup();
    let paragraph = doc.create_element("p").with_text("{count:3}");
    doc.body().append_child(&paragraph).unwrap();

    let model = kontext.bind(json!({"count": 7}), [&paragraph], None).unwrap();
    assert_eq!(model.get("count"), Some(Data::from(7)));
    assert_eq!(paragraph.text_content(), "7");
}

#[test]
fn test_text_without_greedy_skips_missing_keys() {
    let (doc, kontext) = setup();
    let paragraph = doc.create_element("p").with_text("{missing}");
    doc.body().append_child(&paragraph).unwrap();

    let options = Settings::new().with("greedy", false);
    let model = kontext.bind(json!({}), [&paragraph], Some(options)).unwrap();
    assert!(model.is_empty());
    assert_eq!(paragraph.text_content(), "");
}

#[test]
fn test_text_tracks_dotted_keys_through_replaced_submodels() {
    let (doc, kontext) = setup();
    let paragraph = doc.create_element("p").with_text("{user.name}");
    doc.body().append_child(&paragraph).unwrap();

    let model = kontext
        .bind(json!({"user": {"name": "Ada"}}), [&paragraph], None)
        .unwrap();
    model.set("user.name", "Grace");
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(paragraph.text_content(), "Grace");
}

// ----------------------------------------------------------------------
// conditional
// ----------------------------------------------------------------------

#[test]
fn test_conditional_toggles_element() {
    let (doc, kontext) = setup();
    let panel = doc
        .create_element("div")
        .with_attr("data-kontext", "conditional: {visible: true}")
        .with_child(doc.create_element("span").with_text("{name}"));
    doc.body().append_child(&panel).unwrap();

    let model = kontext
        .bind(json!({"visible": false, "name": "Ada"}), [&panel], None)
        .unwrap();
    assert_eq!(panel.parent(), None);
    let placeholder = doc.body().children()[0].clone();
    assert!(placeholder.is_comment());
    assert_eq!(placeholder.data().as_deref(), Some("kontext conditional"));
    assert_eq!(panel.text_content(), "Ada");

    model.set("visible", true);
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(panel.parent(), Some(doc.body()));
    assert_eq!(doc.body().children(), vec![panel.clone()]);

    model.set("visible", false);
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(panel.parent(), None);
}

#[test]
fn test_conditional_binds_children_once() {
    let (doc, kontext) = setup();
    let panel = doc
        .create_element("div")
        .with_attr("data-kontext", "conditional: {count: {$gt: 1}}")
        .with_child(doc.create_element("b").with_text("{count}"));
    doc.body().append_child(&panel).unwrap();

    let model = kontext.bind(json!({"count": 2}), [&panel], None).unwrap();
    let delegate = model.delegation("count").unwrap();
    assert_eq!(delegate.nodes().len(), 1);
    assert_eq!(panel.text_content(), "2");

    model.set("count", 0);
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(panel.parent(), None);
    assert_eq!(panel.text_content(), "0");
}

#[test]
fn test_conditional_with_unknown_operator_fails_bind() {
    let (doc, kontext) = setup();
    let panel = doc
        .create_element("div")
        .with_attr("data-kontext", "conditional: {count: {$near: 1}}");
    doc.body().append_child(&panel).unwrap();

    let err = kontext.bind(json!({"count": 2}), [&panel], None).unwrap_err();
    assert_eq!(
        err,
        KontextError::Condition(ConditionError::unknown_operator("$near"))
    );
}

// ----------------------------------------------------------------------
// each
// ----------------------------------------------------------------------

fn people_list(doc: &Document, attribute: &str) -> Node {
    let list = doc
        .create_element("ul")
        .with_attr("data-kontext", attribute)
        .with_child(doc.create_element("li").with_text("{name}"));
    doc.body().append_child(&list).unwrap();
    list
}

#[test]
fn test_each_renders_one_clone_per_item() {
    let (doc, kontext) = setup();
    let list = people_list(&doc, "each: people");

    kontext
        .bind(json!({"people": [{"name": "Ada"}, {"name": "Grace"}]}), [&list], None)
        .unwrap();
    assert_eq!(texts(&list), vec!["Ada", "Grace"]);
}

#[test]
fn test_each_keeps_nodes_of_surviving_items() {
    let (doc, kontext) = setup();
    let list = people_list(&doc, "each: people");

    let model = kontext
        .bind(
            json!({"people": [{"name": "Ada"}, {"name": "Grace"}, {"name": "Joan"}]}),
            [&list],
            None,
        )
        .unwrap();
    let before = items(&list);
    let people = model.get("people").and_then(|d| d.as_list().cloned()).unwrap();

    people.shift();
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["Grace", "Joan"]);
    assert_eq!(items(&list), before[1..].to_vec());

    people.reverse();
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["Joan", "Grace"]);
    assert_eq!(items(&list), vec![before[2].clone(), before[1].clone()]);

    people.push(json!({"name": "Hedy"}));
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["Joan", "Grace", "Hedy"]);
}

#[test]
fn test_each_item_edits_render_in_place() {
    let (doc, kontext) = setup();
    let list = people_list(&doc, "each: people");

    let model = kontext
        .bind(json!({"people": [{"name": "Ada"}]}), [&list], None)
        .unwrap();
    let first = model
        .get("people")
        .and_then(|d| d.as_list().cloned())
        .and_then(|people| people.get(0))
        .and_then(|item| item.as_model().cloned())
        .unwrap();

    first.set("name", "Ada Lovelace");
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["Ada Lovelace"]);
}

#[test]
fn test_each_wraps_scalars_with_item_and_index() {
    let (doc, kontext) = setup();
    let list = doc
        .create_element("ol")
        .with_attr("data-kontext", "each: tags")
        .with_child(doc.create_element("li").with_text("{$index}={$item}"));
    doc.body().append_child(&list).unwrap();

    let model = kontext.bind(json!({"tags": ["x", "y", "x"]}), [&list], None).unwrap();
    assert_eq!(texts(&list), vec!["0=x", "1=y", "2=x"]);

    let tags = model.get("tags").and_then(|d| d.as_list().cloned()).unwrap();
    tags.shift();
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["0=y", "1=x"]);
}

#[test]
fn test_each_replacing_the_list_rerenders() {
    let (doc, kontext) = setup();
    let list = people_list(&doc, "each: people");

    let model = kontext
        .bind(json!({"people": [{"name": "Ada"}]}), [&list], None)
        .unwrap();
    model.set("people", json!([{"name": "Grace"}, {"name": "Joan"}]));
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["Grace", "Joan"]);

    model.set("people", json!(null));
    doc.event_loop().run_until_idle().unwrap();
    assert!(list.children().is_empty());
}

#[test]
fn test_each_tracks_items_shown_by_a_conditional() {
    let (doc, kontext) = setup();
    let list = doc
        .create_element("ul")
        .with_attr("data-kontext", "each: items")
        .with_child(
            doc.create_element("li")
                .with_attr("data-kontext", "conditional: {show: true}")
                .with_text("{name}"),
        );
    doc.body().append_child(&list).unwrap();

    let model = kontext
        .bind(
            json!({"items": [{"name": "a", "show": false}, {"name": "b", "show": true}]}),
            [&list],
            None,
        )
        .unwrap();
    assert_eq!(texts(&list), vec!["b"]);

    let entries = model.get("items").and_then(|d| d.as_list().cloned()).unwrap();
    let first = entries.get(0).and_then(|item| item.as_model().cloned()).unwrap();
    first.set("show", true);
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["a", "b"]);

    entries.reverse();
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["b", "a"]);

    entries.pop();
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["b"]);

    entries.pop();
    doc.event_loop().run_until_idle().unwrap();
    assert!(list.children().is_empty());
}

#[test]
fn test_each_filter_and_map_functions() {
    let (doc, kontext) = setup();
    kontext.function("even", |_: &Data, index: usize| Data::from(index % 2 == 0));
    kontext.function("shout", |item: &Data, _: usize| {
        Data::from(item.to_text().to_uppercase())
    });

    let list = doc
        .create_element("ul")
        .with_attr("data-kontext", "each: {target: words, filter: even, map: shout}")
        .with_child(doc.create_element("li").with_text("{$item}"));
    doc.body().append_child(&list).unwrap();

    kontext
        .bind(json!({"words": ["a", "b", "c", "d", "e"]}), [&list], None)
        .unwrap();
    assert_eq!(texts(&list), vec!["A", "C", "E"]);
}

#[test]
fn test_each_greedily_defines_missing_list() {
    let (doc, kontext) = setup();
    let list = people_list(&doc, "each: people");

    let model = kontext.bind(json!({}), [&list], None).unwrap();
    assert_eq!(model.snapshot(), json!({"people": []}));
    assert!(list.children().is_empty());

    let people = model.get("people").and_then(|d| d.as_list().cloned()).unwrap();
    people.push(json!({"name": "Ada"}));
    doc.event_loop().run_until_idle().unwrap();
    assert_eq!(texts(&list), vec!["Ada"]);
}

#[test]
fn test_each_requires_a_target() {
    let (doc, kontext) = setup();
    let list = people_list(&doc, "each: {filter: even}");

    let err = kontext.bind(json!({}), [&list], None).unwrap_err();
    assert_eq!(err, KontextError::missing_target("each"));
}

#[test]
fn test_each_unknown_function_fails_bind() {
    let (doc, kontext) = setup();
    let list = people_list(&doc, "each: {target: people, map: nowhere}");

    let err = kontext.bind(json!({"people": []}), [&list], None).unwrap_err();
    assert_eq!(err, KontextError::unknown_function("nowhere"));
}
