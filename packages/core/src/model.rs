//! # Model
//!
//! An ordered map of keys to [`Delegate`]s.
//!
//! ```text
//!   root ──"a"──► A ──"b"──► B ──"c"──► delegate
//!
//!   delegate.set(2)
//!     └─ B.emit_update("c")      B bus: "c"
//!         └─ A.emit_update("b.c")    A bus: "b.c"
//!             └─ root.emit_update("a.b.c")   root bus: "a.b.c"
//! ```
//!
//! Submodels keep weak links to their parents, so an update is re-published on
//! every live ancestor with the key prefixed by the parent's key. Models stored
//! in a [`List`](crate::List) link to the delegate owning the list instead and
//! call its [`Delegate::notify`].

use crate::bus::{Bus, Flow, HandlerId};
use crate::data::Data;
use crate::delegate::{Change, Delegate, WeakDelegate};
use crate::error::{KontextError, KontextResult};
use indexmap::IndexMap;
use kontext_common::EventLoop;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, instrument};

/// Input accepted by [`Model::prepare`]
#[derive(Debug, Clone)]
pub enum ModelSource {
    Json(Value),
    Model(Model),
}

impl From<Value> for ModelSource {
    fn from(value: Value) -> Self {
        ModelSource::Json(value)
    }
}

impl From<Map<String, Value>> for ModelSource {
    fn from(map: Map<String, Value>) -> Self {
        ModelSource::Json(Value::Object(map))
    }
}

impl From<Model> for ModelSource {
    fn from(model: Model) -> Self {
        ModelSource::Model(model)
    }
}

impl From<&Model> for ModelSource {
    fn from(model: &Model) -> Self {
        ModelSource::Model(model.clone())
    }
}

#[derive(Clone)]
enum ParentLink {
    Model { model: WeakModel, key: String },
    Owner(WeakDelegate),
}

struct Slot {
    delegate: Delegate,
    subscription: HandlerId,
}

pub(crate) struct ModelInner {
    slots: RefCell<IndexMap<String, Slot>>,
    parents: RefCell<Vec<ParentLink>>,
    bus: Bus<Change>,
    event_loop: EventLoop,
}

/// Shared handle to a prepared model
#[derive(Clone)]
pub struct Model {
    inner: Rc<ModelInner>,
}

#[derive(Clone)]
pub(crate) struct WeakModel(Weak<ModelInner>);

impl WeakModel {
    pub(crate) fn upgrade(&self) -> Option<Model> {
        self.0.upgrade().map(|inner| Model { inner })
    }
}

impl Model {
    /// An empty model
    pub fn new(event_loop: &EventLoop) -> Self {
        Self {
            inner: Rc::new(ModelInner {
                slots: RefCell::new(IndexMap::new()),
                parents: RefCell::new(Vec::new()),
                bus: Bus::new(event_loop.clone()),
                event_loop: event_loop.clone(),
            }),
        }
    }

    /// Prepare a model; an existing [`Model`] is returned unchanged
    #[instrument(skip_all)]
    pub fn prepare(event_loop: &EventLoop, source: impl Into<ModelSource>) -> KontextResult<Model> {
        match source.into() {
            ModelSource::Model(model) => {
                debug!("Model already prepared");
                Ok(model)
            }
            ModelSource::Json(Value::Object(map)) => {
                debug!(keys = map.len(), "Preparing model");
                Ok(Self::from_map(event_loop, map))
            }
            ModelSource::Json(other) => Err(KontextError::not_an_object(json_kind(&other))),
        }
    }

    pub(crate) fn from_map(event_loop: &EventLoop, map: Map<String, Value>) -> Model {
        let model = Model::new(event_loop);
        for (key, value) in map {
            model.insert_data(&key, Data::Value(value));
        }
        model
    }

    pub(crate) fn downgrade(&self) -> WeakModel {
        WeakModel(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    /// Install an existing delegate under `key`
    ///
    /// The delegate is scoped to this model unless it already has a home. A
    /// delegate previously stored under `key` stops publishing on this model.
    pub fn insert(&self, key: &str, delegate: Delegate) -> Delegate {
        delegate.scope(Some(self), Some(key));

        let weak = self.downgrade();
        let published_key = key.to_string();
        let subscription = delegate.on("update", move |change: &Change| {
            if let Some(model) = weak.upgrade() {
                model.emit_update(&published_key, change.value.clone(), change.prior.clone());
            }
        });

        let previous = self.inner.slots.borrow_mut().insert(
            key.to_string(),
            Slot {
                delegate: delegate.clone(),
                subscription,
            },
        );
        if let Some(previous) = previous {
            previous
                .delegate
                .off(Some("update"), Some(previous.subscription));
        }
        delegate
    }

    fn insert_data(&self, key: &str, data: Data) -> Delegate {
        let delegate = Delegate::detached(&self.inner.event_loop);
        delegate.scope(Some(self), Some(key));
        let data = delegate.adopt(data);
        delegate.store(data);
        self.insert(key, delegate)
    }

    /// Publish an update on this model and every live ancestor
    ///
    /// An ancestor already on the current bubbling chain is skipped, so models
    /// stored inside themselves publish each update once per model.
    pub fn emit_update(&self, key: &str, value: Data, prior: Option<Data>) {
        self.bubble(key, &value, &prior, &mut Vec::new());
    }

    fn bubble(&self, key: &str, value: &Data, prior: &Option<Data>, chain: &mut Vec<Model>) {
        debug!(key, "Model update");
        self.inner.bus.trigger(
            "update",
            Change {
                model: Some(self.clone()),
                key: Some(key.to_string()),
                value: value.clone(),
                prior: prior.clone(),
            },
            None,
        );

        chain.push(self.clone());
        let parents = self.inner.parents.borrow().clone();
        for link in parents {
            match link {
                ParentLink::Model { model, key: parent_key } => {
                    let Some(parent) = model.upgrade() else {
                        continue;
                    };
                    if chain.iter().any(|seen| seen.ptr_eq(&parent)) {
                        debug!(key, parent_key = %parent_key, "Cyclic model reference, not bubbling further");
                        continue;
                    }
                    let dotted = format!("{}.{}", parent_key, key);
                    parent.bubble(&dotted, value, prior, chain);
                }
                ParentLink::Owner(owner) => {
                    if let Some(owner) = owner.upgrade() {
                        owner.notify();
                    }
                }
            }
        }
        chain.pop();
    }

    /// Resolve a dotted path one segment at a time
    ///
    /// Descends only through submodels; the first missing segment yields `None`.
    pub fn delegation(&self, path: &str) -> Option<Delegate> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut delegate = self.slot(first)?;
        for segment in segments {
            let Data::Model(child) = delegate.peek() else {
                return None;
            };
            delegate = child.slot(segment)?;
        }
        Some(delegate)
    }

    fn slot(&self, key: &str) -> Option<Delegate> {
        self.inner
            .slots
            .borrow()
            .get(key)
            .map(|slot| slot.delegate.clone())
    }

    /// Return the delegate at `path`, creating it (and missing submodels) if needed
    ///
    /// An existing delegate is returned unchanged and `initial` is dropped. An
    /// intermediate segment holding a non-model value is replaced by an empty
    /// submodel.
    pub fn define(&self, path: &str, initial: impl Into<Data>) -> Delegate {
        if let Some(existing) = self.delegation(path) {
            return existing;
        }
        let Some((head, rest)) = path.split_once('.') else {
            return self.insert_data(path, initial.into());
        };

        let child = match self.slot(head) {
            Some(delegate) => match delegate.peek() {
                Data::Model(child) => child,
                _ => {
                    let child = Model::new(&self.inner.event_loop);
                    delegate.set(child.clone());
                    child
                }
            },
            None => {
                let child = Model::new(&self.inner.event_loop);
                self.insert_data(head, Data::Model(child.clone()));
                child
            }
        };
        child.define(rest, initial)
    }

    /// Read through the delegation at `path`, emitting `access`
    pub fn get(&self, path: &str) -> Option<Data> {
        self.delegation(path).map(|delegate| delegate.get())
    }

    /// Write through the delegation at `path`; a missing path is a no-op
    pub fn set(&self, path: &str, value: impl Into<Data>) -> bool {
        match self.delegation(path) {
            Some(delegate) => {
                delegate.set(value);
                true
            }
            None => {
                debug!(path, "Ignoring write to missing path");
                false
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.slots.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.borrow().is_empty()
    }

    /// Plain JSON copy, read without notifications
    pub fn snapshot(&self) -> Value {
        let delegates: Vec<(String, Delegate)> = self
            .inner
            .slots
            .borrow()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.delegate.clone()))
            .collect();
        Value::Object(
            delegates
                .into_iter()
                .map(|(key, delegate)| (key, delegate.peek().snapshot()))
                .collect(),
        )
    }

    pub fn on<F, R>(&self, event_type: &str, handler: F) -> HandlerId
    where
        F: Fn(&Change) -> R + 'static,
        R: Into<Flow>,
    {
        self.inner.bus.add(event_type, handler, None)
    }

    pub fn off(&self, event_type: Option<&str>, id: Option<HandlerId>) -> Vec<HandlerId> {
        self.inner.bus.remove(event_type, id)
    }

    pub fn bus(&self) -> &Bus<Change> {
        &self.inner.bus
    }

    pub(crate) fn add_parent(&self, parent: &Model, key: &str) {
        let mut parents = self.inner.parents.borrow_mut();
        let exists = parents.iter().any(|link| match link {
            ParentLink::Model { model, key: k } => {
                k == key && Weak::ptr_eq(&model.0, &Rc::downgrade(&parent.inner))
            }
            ParentLink::Owner(_) => false,
        });
        if !exists {
            parents.push(ParentLink::Model {
                model: parent.downgrade(),
                key: key.to_string(),
            });
        }
    }

    pub(crate) fn remove_parent(&self, parent: &Model, key: &str) {
        let target = Rc::downgrade(&parent.inner);
        self.inner.parents.borrow_mut().retain(|link| match link {
            ParentLink::Model { model, key: k } => !(k == key && Weak::ptr_eq(&model.0, &target)),
            ParentLink::Owner(_) => true,
        });
    }

    pub(crate) fn add_owner(&self, owner: &WeakDelegate) {
        let mut parents = self.inner.parents.borrow_mut();
        let exists = parents.iter().any(|link| match link {
            ParentLink::Owner(existing) => existing.ptr_eq(owner),
            ParentLink::Model { .. } => false,
        });
        if !exists {
            parents.push(ParentLink::Owner(owner.clone()));
        }
    }

    pub(crate) fn remove_owner(&self, owner: &WeakDelegate) {
        self.inner.parents.borrow_mut().retain(|link| match link {
            ParentLink::Owner(existing) => !existing.ptr_eq(owner),
            ParentLink::Model { .. } => true,
        });
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.slots.try_borrow() {
            Ok(slots) => f
                .debug_struct("Model")
                .field("keys", &slots.keys().collect::<Vec<_>>())
                .finish(),
            Err(_) => f.write_str("Model(<busy>)"),
        }
    }
}
