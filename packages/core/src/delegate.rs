//! # Delegate
//!
//! The reactive cell behind every model property.
//!
//! ```text
//!            set(v)                      get()
//!              │                           │
//!              ▼                           ▼
//!   ┌─────────────────────┐        emit "access"
//!   │ value  home  nodes  │
//!   └─────────────────────┘
//!              │ emit "update" (model, key, value, prior)
//!              ├──────────────► model subscription ─► Model::emit_update
//!              └──────────────► frame sync ─► text of every bound node
//! ```
//!
//! The DOM sync handler is registered once at construction. It requests at most
//! one animation frame per burst of updates, so many writes within a frame
//! collapse into a single pass over the bound nodes.

use crate::bus::{Bus, Flow, HandlerId};
use crate::data::Data;
use crate::model::{Model, WeakModel};
use crate::observer::{self, Monitoring};
use kontext_common::EventLoop;
use kontext_dom::Node;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Payload of `update` and `access` notifications
#[derive(Debug, Clone)]
pub struct Change {
    pub model: Option<Model>,
    pub key: Option<String>,
    pub value: Data,
    /// `None` for `access`
    pub prior: Option<Data>,
}

#[derive(Default)]
struct Home {
    model: Option<WeakModel>,
    key: Option<String>,
}

pub(crate) struct DelegateInner {
    value: RefCell<Data>,
    home: RefCell<Home>,
    nodes: RefCell<Vec<Node>>,
    /// Nodes whose edits arrive as queued mutation records
    observed: RefCell<Vec<Node>>,
    /// Our own writes to observed nodes whose records are still queued
    echoes: RefCell<Vec<(Node, String)>>,
    bus: Bus<Change>,
    event_loop: EventLoop,
    frame_requested: Cell<bool>,
}

/// Shared handle to a reactive cell
#[derive(Clone)]
pub struct Delegate {
    inner: Rc<DelegateInner>,
}

#[derive(Clone)]
pub(crate) struct WeakDelegate(Weak<DelegateInner>);

impl WeakDelegate {
    pub(crate) fn upgrade(&self) -> Option<Delegate> {
        self.0.upgrade().map(|inner| Delegate { inner })
    }

    pub(crate) fn ptr_eq(&self, other: &WeakDelegate) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl Delegate {
    /// Create an unbound delegate holding `initial`
    pub fn new(event_loop: &EventLoop, initial: impl Into<Data>) -> Self {
        let delegate = Self::detached(event_loop);
        let data = delegate.adopt(initial.into());
        delegate.store(data);
        delegate
    }

    /// A delegate holding null, with the frame-sync subscription in place
    pub(crate) fn detached(event_loop: &EventLoop) -> Self {
        let inner = Rc::new(DelegateInner {
            value: RefCell::new(Data::null()),
            home: RefCell::new(Home::default()),
            nodes: RefCell::new(Vec::new()),
            observed: RefCell::new(Vec::new()),
            echoes: RefCell::new(Vec::new()),
            bus: Bus::new(event_loop.clone()),
            event_loop: event_loop.clone(),
            frame_requested: Cell::new(false),
        });

        let weak = Rc::downgrade(&inner);
        inner.bus.add(
            "update",
            move |_: &Change| {
                if let Some(inner) = weak.upgrade() {
                    Delegate { inner }.request_sync();
                }
            },
            None,
        );

        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> WeakDelegate {
        WeakDelegate(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Delegate) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read the value, emitting `access`
    pub fn get(&self) -> Data {
        let value = self.peek();
        self.emit("access", value.clone(), None);
        value
    }

    /// Read the value without any notification
    pub fn peek(&self) -> Data {
        self.inner.value.borrow().clone()
    }

    /// Store `value` and emit `update`, returning the prior value
    ///
    /// Always emits, even when the new value equals the current one.
    pub fn set(&self, value: impl Into<Data>) -> Data {
        let data = self.adopt(value.into());
        let prior = self.store(data.clone());
        if !prior.same_identity(&data) {
            self.release(&prior);
        }
        debug!(key = ?self.key(), value = ?data, "Delegate set");
        self.emit("update", data, Some(prior.clone()));
        prior
    }

    /// Emit `update` with the current value as both value and prior
    pub fn notify(&self) {
        let value = self.peek();
        self.emit("update", value.clone(), Some(value));
    }

    /// Bind the home model and key; each is written only if still unset
    pub fn scope(&self, model: Option<&Model>, key: Option<&str>) {
        let changed = {
            let mut home = self.inner.home.borrow_mut();
            let mut changed = false;
            if home.model.is_none() {
                if let Some(model) = model {
                    home.model = Some(model.downgrade());
                    changed = true;
                }
            }
            if home.key.is_none() {
                if let Some(key) = key {
                    home.key = Some(key.to_string());
                    changed = true;
                }
            }
            changed
        };
        if changed {
            self.link(&self.peek());
        }
    }

    pub fn model(&self) -> Option<Model> {
        self.inner
            .home
            .borrow()
            .model
            .as_ref()
            .and_then(WeakModel::upgrade)
    }

    pub fn key(&self) -> Option<String> {
        self.inner.home.borrow().key.clone()
    }

    /// Track `nodes`: monitor each for external edits, sync its text now, append it
    ///
    /// Returns every tracked node. The same node may be tracked more than once,
    /// but it is monitored only the first time.
    pub fn element(&self, nodes: impl IntoIterator<Item = Node>) -> Vec<Node> {
        let text = self.peek().to_text();
        for node in nodes {
            let tracked = self.inner.nodes.borrow().contains(&node);
            if !tracked && observer::monitor(&node, self) == Monitoring::Observer {
                self.inner.observed.borrow_mut().push(node.clone());
            }
            self.write(&node, &text);
            self.inner.nodes.borrow_mut().push(node);
        }
        self.nodes()
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.inner.nodes.borrow().clone()
    }

    /// Subscribe to `update` or `access`
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

    /// Rewrite one node with the canonical text of the current value
    pub(crate) fn resync(&self, node: &Node) {
        self.write(node, &self.peek().to_text());
    }

    /// Consume the oldest pending write to `node` if it produced `text`
    pub(crate) fn take_echo(&self, node: &Node, text: &str) -> bool {
        let mut echoes = self.inner.echoes.borrow_mut();
        match echoes.iter().position(|(target, _)| target == node) {
            Some(index) if echoes[index].1 == text => {
                echoes.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Replace the stored value without notification
    pub(crate) fn store(&self, data: Data) -> Data {
        self.inner.value.replace(data)
    }

    /// Promote raw JSON and link the result to this delegate's home
    pub(crate) fn adopt(&self, data: Data) -> Data {
        let data = data.promote(&self.inner.event_loop);
        self.link(&data);
        data
    }

    fn link(&self, data: &Data) {
        match data {
            Data::Model(child) => {
                if let (Some(model), Some(key)) = (self.model(), self.key()) {
                    child.add_parent(&model, &key);
                }
            }
            Data::List(list) => list.claim(self),
            Data::Value(_) => {}
        }
    }

    fn release(&self, data: &Data) {
        match data {
            Data::Model(child) => {
                if let (Some(model), Some(key)) = (self.model(), self.key()) {
                    child.remove_parent(&model, &key);
                }
            }
            Data::List(list) => list.release(self),
            Data::Value(_) => {}
        }
    }

    fn emit(&self, event_type: &str, value: Data, prior: Option<Data>) {
        let change = Change {
            model: self.model(),
            key: self.key(),
            value,
            prior,
        };
        self.inner.bus.trigger(event_type, change, None);
    }

    fn request_sync(&self) {
        if self.inner.frame_requested.replace(true) {
            return;
        }
        debug!(key = ?self.key(), "Requesting frame for DOM sync");
        let weak = Rc::downgrade(&self.inner);
        self.inner.event_loop.request_frame(move || {
            if let Some(inner) = weak.upgrade() {
                inner.frame_requested.set(false);
                Delegate { inner }.sync_nodes();
            }
        });
    }

    fn sync_nodes(&self) {
        let text = self.peek().to_text();
        for node in self.nodes() {
            self.write(&node, &text);
        }
    }

    fn write(&self, node: &Node, text: &str) {
        if node_text(node) == text {
            return;
        }
        if node.is_element() {
            node.set_text_content(text);
            return;
        }
        if self.inner.observed.borrow().contains(node) {
            self.inner
                .echoes
                .borrow_mut()
                .push((node.clone(), text.to_string()));
        }
        if let Err(e) = node.set_data(text) {
            warn!(error = %e, "Failed to sync bound node");
        }
    }
}

/// Current text of a bound node
pub(crate) fn node_text(node: &Node) -> String {
    node.data().unwrap_or_else(|| node.text_content())
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Delegate");
        debug.field("key", &self.key());
        match self.inner.value.try_borrow() {
            Ok(value) => debug.field("value", &*value),
            Err(_) => debug.field("value", &"<busy>"),
        };
        debug.field("nodes", &self.inner.nodes.borrow().len()).finish()
    }
}
