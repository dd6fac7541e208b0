//! Per-invocation context handed to extensions

use crate::binder::Kontext;
use crate::settings::Settings;
use kontext_dom::Node;
use std::cell::RefCell;
use std::collections::HashSet;

/// Subtrees excluded from the rest of one `bind` call
#[derive(Default)]
pub(crate) struct Descent {
    stops: RefCell<Vec<Stop>>,
}

struct Stop {
    root: Node,
    // Taken when the stop is requested, so nodes detached afterwards stay covered
    descendants: HashSet<Node>,
}

impl Descent {
    pub(crate) fn stop(&self, root: &Node) {
        let descendants = root.descendants().into_iter().collect();
        self.stops.borrow_mut().push(Stop {
            root: root.clone(),
            descendants,
        });
    }

    /// Whether `node` is a stopped element or lies below one
    pub(crate) fn is_stopped(&self, node: &Node) -> bool {
        self.stops
            .borrow()
            .iter()
            .any(|stop| stop.root.contains(node) || stop.descendants.contains(node))
    }
}

/// Context for one extension applied to one element
pub struct Jit<'a> {
    pub(crate) kontext: &'a Kontext,
    pub(crate) settings: &'a Settings,
    pub(crate) extension: &'a str,
    pub(crate) element: &'a Node,
    pub(crate) descent: &'a Descent,
}

impl<'a> Jit<'a> {
    /// Effective options of the running `bind` call
    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Registered name the extension was resolved to
    pub fn extension(&self) -> &str {
        self.extension
    }

    /// The library instance, for recursive binds
    pub fn kontext(&self) -> &Kontext {
        self.kontext
    }

    pub fn element(&self) -> &Node {
        self.element
    }

    /// Skip everything below the current element for the rest of this `bind` call
    pub fn stop_descend(&self) {
        self.descent.stop(self.element);
    }
}
