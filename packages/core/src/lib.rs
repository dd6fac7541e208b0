//! # Kontext
//!
//! Reactive two-way binding between data models and DOM text nodes.
//!
//! ```rust,ignore
//! let doc = Document::new(EventLoop::new());
//! let kontext = Kontext::new(&doc);
//!
//! // <p>Hello, {name}</p>
//! let model = kontext.bind(json!({"name": "Ada"}), [&paragraph], None)?;
//! model.set("name", "Grace");
//!
//! doc.event_loop().run_until_idle()?;   // notification chains
//! doc.event_loop().run_frame();         // DOM sync
//! ```
//!
//! - **Delegate**: a value cell with the text nodes it renders into
//! - **Model**: keys mapped to delegates; nested models and lists propagate
//!   updates upwards as `parent.key` notifications
//! - **List**: an observable sequence owned by the delegate holding it
//! - **Providers** find binding configuration in the document (`data-kontext`
//!   attributes, `{key}` placeholders) and **extensions** (`text`,
//!   `conditional`, `each`) make it live
//!
//! Notifications run one handler per event-loop task; writes to the DOM are
//! coalesced into one animation frame per delegate.

pub mod binder;
pub mod bus;
pub mod config;
pub mod data;
pub mod delegate;
pub mod error;
pub mod extensions;
pub mod jit;
pub mod list;
pub mod model;
pub mod observer;
pub mod providers;
pub mod registry;
pub mod settings;

#[cfg(test)]
mod tests_delegate;

#[cfg(test)]
mod tests_model;

pub use binder::{Binding, Function, Kontext, KontextEvent, Target};
pub use bus::{Bus, Flow, HandlerId};
pub use config::{KontextConfig, DEFAULT_CONFIG_NAME};
pub use data::Data;
pub use delegate::{Change, Delegate};
pub use error::{KontextError, KontextResult};
pub use extensions::{ConditionalExtension, EachExtension, Extension, TextExtension};
pub use jit::Jit;
pub use list::List;
pub use model::{Model, ModelSource};
pub use observer::{coerce, Monitoring};
pub use providers::{AttributeProvider, Provider, TextProvider, DEFAULT_PATTERN};
pub use registry::{Registry, Resolution};
pub use settings::{Setting, Settings};

pub use kontext_common::EventLoop;
pub use kontext_dom::{Document, Features, Node};
