//! # Binder
//!
//! The library instance. It owns the settings stores, the provider, extension
//! and function registries, and the list of bindings.
//!
//! ```text
//! bind(model, targets, options)
//!   ├─ prepare model
//!   ├─ expand targets ─► [element, ...]         (none given: <body>)
//!   ├─ options = public.combine(options)
//!   └─ for each element
//!        ├─ record binding (model, element)
//!        └─ for each provider in options.providers
//!             scan ─► (node, {ext: config}) ...
//!               └─ unless below a stop_descend(): resolve ext ─► apply(node, model, config, jit)
//! ```
//!
//! Providers are scanned one at a time and their yields processed after the
//! scan, so a later provider sees the DOM as left by earlier extensions.

use crate::bus::{Bus, Flow, HandlerId};
use crate::config::KontextConfig;
use crate::data::Data;
use crate::delegate::Delegate;
use crate::error::{KontextError, KontextResult};
use crate::extensions::{ConditionalExtension, EachExtension, Extension, TextExtension};
use crate::jit::{Descent, Jit};
use crate::model::{Model, ModelSource};
use crate::providers::{AttributeProvider, Provider, TextProvider};
use crate::registry::{Registry, Resolution};
use crate::settings::{Setting, Settings};
use indexmap::IndexMap;
use kontext_common::EventLoop;
use kontext_dom::{Document, Node};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, instrument};

/// A named function usable as an `each` filter or map
pub type Function = Rc<dyn Fn(&Data, usize) -> Data>;

/// A model bound to a DOM node
#[derive(Debug, Clone)]
pub struct Binding {
    pub model: Model,
    pub target: Node,
}

/// What [`Kontext::bind`] binds to
#[derive(Debug, Clone)]
pub enum Target {
    Node(Node),
    Selector(String),
    Many(Vec<Target>),
}

impl From<Node> for Target {
    fn from(node: Node) -> Self {
        Target::Node(node)
    }
}

impl From<&Node> for Target {
    fn from(node: &Node) -> Self {
        Target::Node(node.clone())
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

impl<T: Into<Target>> From<Vec<T>> for Target {
    fn from(targets: Vec<T>) -> Self {
        Target::Many(targets.into_iter().map(Into::into).collect())
    }
}

/// Payload of the library bus
#[derive(Debug, Clone)]
pub enum KontextEvent {
    /// Delivered once, after construction; carries the environment error if any
    Ready { error: Option<KontextError> },
    Bind { model: Model, elements: Vec<Node> },
}

struct KontextInner {
    document: Document,
    public: RefCell<Settings>,
    private: RefCell<Settings>,
    extensions: RefCell<Registry<Rc<dyn Extension>>>,
    providers: RefCell<Registry<Rc<dyn Provider>>>,
    functions: RefCell<IndexMap<String, Function>>,
    bindings: RefCell<Vec<Binding>>,
    bus: Bus<KontextEvent>,
}

/// Shared handle to a library instance
#[derive(Clone)]
pub struct Kontext {
    inner: Rc<KontextInner>,
}

impl Kontext {
    pub fn new(document: &Document) -> Self {
        Self::with_config(document, KontextConfig::default())
    }

    pub fn with_config(document: &Document, config: KontextConfig) -> Self {
        let event_loop = document.event_loop().clone();
        event_loop.set_max_iterations(config.max_loop_iterations);

        let kontext = Self {
            inner: Rc::new(KontextInner {
                document: document.clone(),
                public: RefCell::new(Settings::new()),
                private: RefCell::new(Settings::new()),
                extensions: RefCell::new(Registry::new()),
                providers: RefCell::new(Registry::new()),
                functions: RefCell::new(IndexMap::new()),
                bindings: RefCell::new(Vec::new()),
                bus: Bus::new(event_loop.clone()),
            }),
        };

        kontext.detect_features();
        kontext.provider("attribute", AttributeProvider, AttributeProvider::defaults());
        kontext.provider("text", TextProvider, TextProvider::defaults());
        kontext.extension("text", TextExtension);
        kontext.extension("conditional", ConditionalExtension);
        kontext.extension("each", EachExtension);
        kontext.merge_defaults(config.into_settings());

        let weak = Rc::downgrade(&kontext.inner);
        event_loop.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                let kontext = Kontext { inner };
                kontext.inner.private.borrow_mut().set("ready", true);
                let error = kontext.environment_error();
                debug!(error = ?error, "Kontext ready");
                kontext.inner.bus.trigger("ready", KontextEvent::Ready { error }, None);
            }
        });

        kontext
    }

    fn detect_features(&self) {
        let features = self.inner.document.features();
        let mut private = self.inner.private.borrow_mut();
        private.set("features.mutationObserver", features.mutation_observer);
        private.set("features.mutationEvents", features.mutation_events);
        private.set("features.eventListeners", features.event_listeners);
        private.set("features.propertyDescriptors", features.property_descriptors);
    }

    fn environment_error(&self) -> Option<KontextError> {
        let private = self.inner.private.borrow();
        if private.get_bool("features.eventListeners") != Some(true) {
            return Some(KontextError::unsupported("event listeners"));
        }
        if private.get_bool("features.propertyDescriptors") != Some(true) {
            return Some(KontextError::unsupported("property descriptors"));
        }
        None
    }

    fn downgrade(&self) -> Weak<KontextInner> {
        Rc::downgrade(&self.inner)
    }

    // ------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------

    /// Bind `model` to `targets` (the document body when there are none)
    #[instrument(skip_all, fields(providers))]
    pub fn bind<M, I>(&self, model: M, targets: I, options: Option<Settings>) -> KontextResult<Model>
    where
        M: Into<ModelSource>,
        I: IntoIterator,
        I::Item: Into<Target>,
    {
        let model = self.prepare(model)?;

        let mut elements = Vec::new();
        let mut any_target = false;
        for target in targets {
            any_target = true;
            self.expand(target.into(), &mut elements)?;
        }
        if !any_target {
            elements.push(self.inner.document.body());
        }

        let options = match options {
            Some(options) => self.inner.public.borrow().combine(&options),
            None => self.inner.public.borrow().clone(),
        };
        let provider_names = options.get_strings("providers");
        tracing::Span::current().record("providers", tracing::field::debug(&provider_names));

        let descent = Descent::default();
        for element in &elements {
            self.inner.bindings.borrow_mut().push(Binding {
                model: model.clone(),
                target: element.clone(),
            });

            for provider_name in &provider_names {
                let provider = self.inner.providers.borrow().get(provider_name).cloned();
                let Some(provider) = provider else {
                    error!(provider = %provider_name, "Unknown provider");
                    continue;
                };

                let mut found: Vec<(Node, Map<String, Value>)> = Vec::new();
                provider.scan(&options, element, &mut |node, config| found.push((node, config)));

                for (node, config) in found {
                    if descent.is_stopped(&node) {
                        debug!(node = ?node, "Skipping node below a stopped element");
                        continue;
                    }
                    self.apply(&node, &model, &config, &options, &descent)?;
                }
            }
        }

        info!(elements = elements.len(), keys = model.len(), "Bound model");
        self.inner.bus.trigger(
            "bind",
            KontextEvent::Bind {
                model: model.clone(),
                elements,
            },
            None,
        );
        Ok(model)
    }

    fn apply(
        &self,
        node: &Node,
        model: &Model,
        config: &Map<String, Value>,
        options: &Settings,
        descent: &Descent,
    ) -> KontextResult<()> {
        let abbreviate = options.get_bool("abbreviateExtensions").unwrap_or(true);

        for (name, value) in config {
            let resolution = self.inner.extensions.borrow().resolve(name, abbreviate);
            let (resolved, handler) = match resolution {
                Resolution::Exact { name, handler } => (name, handler),
                Resolution::Abbreviated { name: full, handler } => {
                    debug!(extension = %name, resolved = %full, "Abbreviated extension");
                    (full, handler)
                }
                Resolution::Unknown => {
                    error!(extension = %name, "Unknown extension");
                    continue;
                }
                Resolution::Ambiguous(candidates) => {
                    error!(extension = %name, candidates = ?candidates, "Ambiguous extension");
                    continue;
                }
            };

            let jit = Jit {
                kontext: self,
                settings: options,
                extension: &resolved,
                element: node,
                descent,
            };
            handler.apply(node, model, value, &jit)?;
        }
        Ok(())
    }

    fn expand(&self, target: Target, out: &mut Vec<Node>) -> KontextResult<()> {
        match target {
            Target::Node(node) => push_unique(out, node),
            Target::Selector(selector) => {
                for node in self.inner.document.query_selector_all(&selector)? {
                    push_unique(out, node);
                }
            }
            Target::Many(targets) => {
                for target in targets {
                    self.expand(target, out)?;
                }
            }
        }
        Ok(())
    }

    /// Models bound to `node` or its ancestors, nearest first, without duplicates
    pub fn bindings(&self, node: &Node) -> Vec<Model> {
        let bindings = self.inner.bindings.borrow();
        let mut models: Vec<Model> = Vec::new();

        let mut current = Some(node.clone());
        while let Some(level) = current {
            for binding in bindings.iter().filter(|b| b.target == level) {
                if !models.iter().any(|m| m.ptr_eq(&binding.model)) {
                    models.push(binding.model.clone());
                }
            }
            current = level.parent();
        }
        models
    }

    pub fn prepare(&self, source: impl Into<ModelSource>) -> KontextResult<Model> {
        Model::prepare(self.event_loop(), source)
    }

    /// A standalone delegate
    pub fn delegate(&self, initial: impl Into<Data>) -> Delegate {
        Delegate::new(self.event_loop(), initial)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Copy of the public defaults
    pub fn defaults(&self) -> Settings {
        self.inner.public.borrow().clone()
    }

    pub fn set_default(&self, path: &str, value: impl Into<Setting>) -> Setting {
        self.inner.public.borrow_mut().set(path, value)
    }

    pub fn merge_defaults(&self, patch: Settings) {
        self.inner.public.borrow_mut().merge(patch);
    }

    /// Read internal state (`ready`, `features.*`, `providers.*`)
    pub fn state(&self, path: &str) -> Option<Setting> {
        self.inner.private.borrow().get(path).cloned()
    }

    // ------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------

    pub fn extension(&self, name: &str, handler: impl Extension + 'static) {
        debug!(extension = name, "Registering extension");
        self.inner
            .extensions
            .borrow_mut()
            .insert(name, Rc::new(handler) as Rc<dyn Extension>);
    }

    pub fn extension_names(&self) -> Vec<String> {
        self.inner.extensions.borrow().names()
    }

    /// Register a provider and merge its defaults into the public settings
    pub fn provider(&self, name: &str, handler: impl Provider + 'static, defaults: Settings) {
        debug!(provider = name, "Registering provider");
        self.inner
            .providers
            .borrow_mut()
            .insert(name, Rc::new(handler) as Rc<dyn Provider>);
        self.inner
            .private
            .borrow_mut()
            .set(&format!("providers.{}", name), defaults.clone());
        self.merge_defaults(defaults);
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.inner.providers.borrow().names()
    }

    /// Register a function for `each` filters and maps
    pub fn function(&self, name: &str, f: impl Fn(&Data, usize) -> Data + 'static) {
        self.inner
            .functions
            .borrow_mut()
            .insert(name.to_string(), Rc::new(f));
    }

    pub fn function_named(&self, name: &str) -> Option<Function> {
        self.inner.functions.borrow().get(name).cloned()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Run `callback` once the instance is ready, with the environment error if any
    pub fn ready(&self, callback: impl Fn(Option<&KontextError>) + 'static) {
        if self.state("ready").and_then(|s| s.as_bool()) == Some(true) {
            let weak = self.downgrade();
            self.event_loop().schedule(move || {
                if let Some(inner) = weak.upgrade() {
                    callback(Kontext { inner }.environment_error().as_ref());
                }
            });
            return;
        }
        self.inner.bus.add(
            "ready",
            move |event: &KontextEvent| {
                if let KontextEvent::Ready { error } = event {
                    callback(error.as_ref());
                }
            },
            Some(1),
        );
    }

    pub fn on<F, R>(&self, event_type: &str, handler: F) -> HandlerId
    where
        F: Fn(&KontextEvent) -> R + 'static,
        R: Into<Flow>,
    {
        self.inner.bus.add(event_type, handler, None)
    }

    pub fn off(&self, event_type: Option<&str>, id: Option<HandlerId>) -> Vec<HandlerId> {
        self.inner.bus.remove(event_type, id)
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn event_loop(&self) -> &EventLoop {
        self.inner.document.event_loop()
    }
}

fn push_unique(out: &mut Vec<Node>, node: Node) {
    if !out.contains(&node) {
        out.push(node);
    }
}

impl fmt::Debug for Kontext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kontext")
            .field("extensions", &self.extension_names())
            .field("providers", &self.provider_names())
            .field("bindings", &self.inner.bindings.borrow().len())
            .finish()
    }
}
