//! Repeats an element's children once per list item
//!
//! The children present at bind time become the template. Every visible item
//! gets a deep clone bound to the item's model; scalar items are wrapped in a
//! model holding `$item` and `$index`.
//!
//! On each `update` of the list's delegate the rendered items are reconciled by
//! set difference: nodes of vanished items are removed, nodes of surviving items
//! are kept, new items are rendered, and everything is re-appended in list
//! order. Models match by identity, scalars by value and occurrence.
//!
//! Each item starts with a comment anchor. The item's nodes are whatever sits
//! between its anchor and the next one, read at reconcile time, so nodes swapped
//! in by nested bindings (a shown `conditional`) move and vanish with the item.

use super::{config_field, config_target, greedy, Extension};
use crate::binder::{Function, Kontext};
use crate::data::Data;
use crate::delegate::Change;
use crate::error::{KontextError, KontextResult};
use crate::jit::Jit;
use crate::list::List;
use crate::model::Model;
use crate::settings::Settings;
use kontext_common::EventLoop;
use kontext_condition::{is_truthy, values_equal};
use kontext_dom::{Node, NodeId};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, error, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct EachExtension;

impl Extension for EachExtension {
    fn apply(&self, element: &Node, model: &Model, config: &Value, jit: &Jit<'_>) -> KontextResult<()> {
        let target = config_target(config).ok_or_else(|| KontextError::missing_target(jit.extension()))?;
        let filter = lookup_function(jit.kontext(), config, "filter")?;
        let map = lookup_function(jit.kontext(), config, "map")?;

        let delegate = match model.delegation(target) {
            Some(delegate) => delegate,
            None if greedy(jit) => model.define(target, Value::Array(Vec::new())),
            None => {
                warn!(target, "No such key and greedy mode is off; each binding skipped");
                return Ok(());
            }
        };

        jit.stop_descend();
        let template = element.children();
        for node in &template {
            node.remove();
        }

        let renderer = Rc::new(Renderer {
            element: element.clone(),
            template,
            kontext: jit.kontext().clone(),
            settings: jit.settings().clone(),
            event_loop: model.event_loop().clone(),
            filter,
            map,
            rendered: RefCell::new(Vec::new()),
        });
        renderer.reconcile(&delegate.peek())?;

        delegate.on("update", move |change: &Change| {
            if let Err(e) = renderer.reconcile(&change.value) {
                error!(error = %e, "Each binding failed to render");
            }
        });
        Ok(())
    }
}

fn lookup_function(kontext: &Kontext, config: &Value, field: &str) -> KontextResult<Option<Function>> {
    match config_field(config, field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => kontext
            .function_named(name)
            .map(Some)
            .ok_or_else(|| KontextError::unknown_function(name.as_str())),
        Some(other) => Err(KontextError::unknown_function(other.to_string())),
    }
}

#[derive(Clone)]
enum ItemKey {
    Model(Model),
    List(List),
    Scalar(Value, usize),
}

impl ItemKey {
    fn matches(&self, other: &ItemKey) -> bool {
        match (self, other) {
            (ItemKey::Model(a), ItemKey::Model(b)) => a.ptr_eq(b),
            (ItemKey::List(a), ItemKey::List(b)) => a.ptr_eq(b),
            (ItemKey::Scalar(a, n), ItemKey::Scalar(b, m)) => n == m && values_equal(a, b),
            _ => false,
        }
    }
}

const ANCHOR: &str = "kontext each";

struct Rendered {
    key: ItemKey,
    anchor: Node,
    /// Wrapper model of a scalar item
    scope: Option<Model>,
}

struct Renderer {
    element: Node,
    template: Vec<Node>,
    kontext: Kontext,
    settings: Settings,
    event_loop: EventLoop,
    filter: Option<Function>,
    map: Option<Function>,
    rendered: RefCell<Vec<Rendered>>,
}

impl Renderer {
    fn visible_items(&self, value: &Data) -> Vec<Data> {
        let items = match value {
            Data::List(list) => list.to_vec(),
            Data::Value(Value::Null) => Vec::new(),
            other => {
                debug!(value = ?other, "Each target is not a list");
                Vec::new()
            }
        };

        let mut visible = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if let Some(filter) = &self.filter {
                if !is_truthy(&filter(&item, index).snapshot()) {
                    continue;
                }
            }
            let item = match &self.map {
                Some(map) => map(&item, index).promote(&self.event_loop),
                None => item,
            };
            visible.push(item);
        }
        visible
    }

    fn keys(items: &[Data]) -> Vec<ItemKey> {
        let mut keys: Vec<ItemKey> = Vec::with_capacity(items.len());
        for item in items {
            let key = match item {
                Data::Model(model) => ItemKey::Model(model.clone()),
                Data::List(list) => ItemKey::List(list.clone()),
                Data::Value(value) => {
                    let occurrence = keys
                        .iter()
                        .filter(|key| matches!(key, ItemKey::Scalar(seen, _) if values_equal(seen, value)))
                        .count();
                    ItemKey::Scalar(value.clone(), occurrence)
                }
            };
            keys.push(key);
        }
        keys
    }

    fn reconcile(&self, value: &Data) -> KontextResult<()> {
        let items = self.visible_items(value);
        let keys = Self::keys(&items);

        let mut previous: Vec<Option<Rendered>> = self
            .rendered
            .borrow_mut()
            .drain(..)
            .map(Some)
            .collect();
        let mut next = Vec::with_capacity(items.len());
        let (mut kept, mut created) = (0, 0);

        for (index, (item, key)) in items.into_iter().zip(keys).enumerate() {
            let survivor = previous
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|r| r.key.matches(&key)))
                .and_then(Option::take);
            match survivor {
                Some(rendered) => {
                    if let Some(scope) = &rendered.scope {
                        let position = Data::from(index);
                        if scope.delegation("$index").is_some_and(|d| d.peek() != position) {
                            scope.set("$index", position);
                        }
                    }
                    kept += 1;
                    next.push(rendered);
                }
                None => {
                    next.push(self.render(item, key, index)?);
                    created += 1;
                }
            }
        }

        let mut segments = self.segments();
        let mut removed = 0;
        for stale in previous.into_iter().flatten() {
            for node in segments.remove(&stale.anchor.id()).unwrap_or_default() {
                node.remove();
            }
            removed += 1;
        }

        for rendered in &next {
            for node in segments.remove(&rendered.anchor.id()).unwrap_or_default() {
                self.element.append_child(&node)?;
            }
        }

        debug!(kept, created, removed, "Each binding reconciled");
        *self.rendered.borrow_mut() = next;
        Ok(())
    }

    /// Current children grouped by item anchor, each group led by its anchor
    fn segments(&self) -> HashMap<NodeId, Vec<Node>> {
        let mut segments: HashMap<NodeId, Vec<Node>> = HashMap::new();
        let mut current = None;
        for child in self.element.children() {
            if child.is_comment() && child.data().as_deref() == Some(ANCHOR) {
                current = Some(child.id());
            }
            if let Some(anchor) = current {
                segments.entry(anchor).or_default().push(child);
            }
        }
        segments
    }

    fn render(&self, item: Data, key: ItemKey, index: usize) -> KontextResult<Rendered> {
        let (model, scope) = match item {
            Data::Model(model) => (model, None),
            other => {
                let scope = Model::new(&self.event_loop);
                scope.define("$item", other);
                scope.define("$index", index);
                (scope.clone(), Some(scope))
            }
        };

        let anchor = self.element.document().create_comment(ANCHOR);
        self.element.append_child(&anchor)?;
        let clones: Vec<Node> = self.template.iter().map(|node| node.clone_node(true)).collect();
        for clone in &clones {
            self.element.append_child(clone)?;
        }
        self.kontext.bind(&model, clones, Some(self.settings.clone()))?;

        Ok(Rendered { key, anchor, scope })
    }
}
