//! External-mutation observer
//!
//! Feeds edits made to bound text nodes outside the library back into their
//! delegate, coerced to the type of the delegate's current value.

use crate::data::Data;
use crate::delegate::{node_text, Delegate, WeakDelegate};
use kontext_dom::{Node, CHARACTER_DATA_MODIFIED};
use serde_json::{Number, Value};
use tracing::debug;

/// How an edit to a bound node is observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monitoring {
    /// Native mutation observer, records delivered as a task
    Observer,
    /// Legacy `DOMCharacterDataModified` events, dispatched synchronously
    MutationEvents,
    /// Nothing available; external edits go unnoticed
    Unobserved,
}

/// Watch `node` for external changes and write them back through `delegate`
pub fn monitor(node: &Node, delegate: &Delegate) -> Monitoring {
    let features = node.document().features();

    if features.mutation_observer {
        let weak = delegate.downgrade();
        if node.observe_character_data(move |record| {
            apply(&weak, &record.target, &record.value);
        }) {
            return Monitoring::Observer;
        }
    }

    if features.mutation_events {
        let weak = delegate.downgrade();
        let listener = node.add_event_listener(CHARACTER_DATA_MODIFIED, move |event| {
            let text = event
                .new_value
                .clone()
                .unwrap_or_else(|| node_text(&event.target));
            apply(&weak, &event.target, &text);
        });
        if listener.is_some() {
            return Monitoring::MutationEvents;
        }
    }

    debug!(node = ?node, "No mutation observation available; external edits are ignored");
    Monitoring::Unobserved
}

fn apply(weak: &WeakDelegate, node: &Node, text: &str) {
    let Some(delegate) = weak.upgrade() else {
        return;
    };
    // Records of our own writes may arrive after the value moved on
    if delegate.take_echo(node, text) {
        return;
    }
    let current = delegate.peek();
    if current.to_text() == text {
        return;
    }

    match coerce(&current, text) {
        Some(value) if value != current => {
            debug!(key = ?delegate.key(), text, "External edit written back");
            delegate.set(value);
        }
        Some(_) => delegate.resync(node),
        None => {
            debug!(key = ?delegate.key(), text, "Rejected external edit");
            delegate.resync(node);
        }
    }
}

/// Coerce `text` to the type of `current`
///
/// Booleans follow string truthiness (only `""` is false). Numbers parse as an
/// integer first, then as a float; blank text is zero and unparsable text yields
/// `None`. Anything else takes the text as is.
pub fn coerce(current: &Data, text: &str) -> Option<Data> {
    match current {
        Data::Value(Value::Bool(_)) => Some(Data::from(!text.is_empty())),
        Data::Value(Value::Number(_)) => parse_number(text).map(Data::Value),
        _ => Some(Data::from(text)),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Value::from(0));
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(Value::from(integer));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
