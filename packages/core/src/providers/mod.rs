//! Providers discover binding configuration on and under an element

mod attribute;
mod text;

pub use attribute::AttributeProvider;
pub(crate) use attribute::DEFAULT_ATTRIBUTE;
pub use text::{TextProvider, DEFAULT_PATTERN};

use crate::settings::Settings;
use kontext_dom::Node;
use serde_json::{Map, Value};

/// Yields `(node, {extension name: config})` pairs found under an element
pub trait Provider {
    fn scan(&self, settings: &Settings, element: &Node, emit: &mut dyn FnMut(Node, Map<String, Value>));
}

impl<F> Provider for F
where
    F: Fn(&Settings, &Node, &mut dyn FnMut(Node, Map<String, Value>)),
{
    fn scan(&self, settings: &Settings, element: &Node, emit: &mut dyn FnMut(Node, Map<String, Value>)) {
        self(settings, element, emit)
    }
}
