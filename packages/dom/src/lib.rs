//! # Kontext DOM
//!
//! An arena-backed, single-threaded document tree that stands in for the browser
//! DOM. It provides exactly what the binding engine needs:
//!
//! - element / text / comment nodes with parent pointers
//! - simple CSS selectors (`tag`, `#id`, `.class`, `[attr]`, `[attr=value]`,
//!   descendant combinator, selector lists)
//! - synchronous, bubbling event listeners
//! - character-data observation, either as queued mutation records (native
//!   observers) or as synchronous `DOMCharacterDataModified` events (legacy)
//!
//! Which of those mechanisms exist is controlled by [`Features`], so older
//! environments can be simulated.

pub mod document;
pub mod error;
pub mod events;
pub mod features;
pub mod node;
pub mod selector;

#[cfg(test)]
mod tests_document;

pub use document::Document;
pub use error::{DomError, DomResult};
pub use events::{DomEvent, ListenerId, MutationRecord, CHARACTER_DATA_MODIFIED};
pub use features::Features;
pub use node::{Node, NodeId, NodeKind};
pub use selector::SelectorList;
