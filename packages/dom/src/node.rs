use crate::document::{Document, ListenerEntry, NodeData};
use crate::error::{DomError, DomResult};
use crate::events::{DomEvent, ListenerId, MutationRecord, CHARACTER_DATA_MODIFIED};
use crate::selector::SelectorList;
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use tracing::trace;

/// Index of a node inside its document's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
    },
    Text(String),
    Comment(String),
}

/// Handle to a node of a [`Document`]
///
/// Handles are cheap to clone. Two handles are equal when they point at the same
/// node of the same document.
#[derive(Clone)]
pub struct Node {
    document: Document,
    id: NodeId,
}

impl Node {
    pub(crate) fn new(document: Document, id: NodeId) -> Self {
        Self { document, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn with_data<R>(&self, f: impl FnOnce(&NodeData) -> R) -> R {
        let state = self.document.state.borrow();
        f(&state.nodes[self.id.0])
    }

    fn same_document(&self, other: &Node) -> DomResult<()> {
        if self.document.ptr_eq(&other.document) {
            Ok(())
        } else {
            Err(DomError::WrongDocument)
        }
    }

    // ------------------------------------------------------------------
    // Kind
    // ------------------------------------------------------------------

    pub fn kind(&self) -> NodeKind {
        self.with_data(|data| data.kind.clone())
    }

    pub fn is_element(&self) -> bool {
        self.with_data(|data| matches!(data.kind, NodeKind::Element { .. }))
    }

    pub fn is_text(&self) -> bool {
        self.with_data(|data| matches!(data.kind, NodeKind::Text(_)))
    }

    pub fn is_comment(&self) -> bool {
        self.with_data(|data| matches!(data.kind, NodeKind::Comment(_)))
    }

    pub fn tag_name(&self) -> Option<String> {
        self.with_data(|data| match &data.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        })
    }

    // ------------------------------------------------------------------
    // Tree navigation
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.with_data(|data| data.parent)
            .map(|id| self.document.node(id))
    }

    pub fn children(&self) -> Vec<Node> {
        self.with_data(|data| data.children.clone())
            .into_iter()
            .map(|id| self.document.node(id))
            .collect()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.with_data(|data| data.children.first().copied())
            .map(|id| self.document.node(id))
    }

    /// All descendants in document (pre-)order, excluding `self`
    pub fn descendants(&self) -> Vec<Node> {
        let mut ids = Vec::new();
        self.document.state.borrow().descendants(self.id, &mut ids);
        ids.into_iter().map(|id| self.document.node(id)).collect()
    }

    /// Parent chain from the direct parent up to the root
    pub fn ancestors(&self) -> Vec<Node> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            ancestors.push(node);
        }
        ancestors
    }

    /// Inclusive containment: a node contains itself
    pub fn contains(&self, other: &Node) -> bool {
        self.document.ptr_eq(&other.document)
            && self
                .document
                .state
                .borrow()
                .is_ancestor_or_self(self.id, other.id)
    }

    /// Whether the node is attached to the document element
    pub fn is_connected(&self) -> bool {
        self.document.document_element().contains(self)
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Character data of a text or comment node
    pub fn data(&self) -> Option<String> {
        self.with_data(|data| match &data.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        })
    }

    /// Replace the character data of a text or comment node
    ///
    /// Notifies native observers (as a queued task) and legacy
    /// `DOMCharacterDataModified` listeners (synchronously), as supported by the
    /// document's [`Features`](crate::Features).
    pub fn set_data(&self, value: &str) -> DomResult<()> {
        let (old_value, observers, features) = {
            let mut state = self.document.state.borrow_mut();
            let features = state.features;
            let old_value = match &mut state.nodes[self.id.0].kind {
                NodeKind::Text(text) | NodeKind::Comment(text) => {
                    std::mem::replace(text, value.to_string())
                }
                NodeKind::Element { .. } => {
                    return Err(DomError::NotCharacterData { node: self.id.0 })
                }
            };
            let observers = if features.mutation_observer {
                state.observers.get(&self.id).cloned().unwrap_or_default()
            } else {
                Vec::new()
            };
            (old_value, observers, features)
        };

        trace!(node = self.id.0, old = %old_value, new = %value, "Character data changed");

        if !observers.is_empty() {
            let record = MutationRecord {
                target: self.clone(),
                old_value: old_value.clone(),
                value: value.to_string(),
            };
            self.document.event_loop().schedule(move || {
                for observer in observers {
                    observer(&record);
                }
            });
        }

        if features.mutation_events {
            self.dispatch(
                CHARACTER_DATA_MODIFIED,
                Some(old_value),
                Some(value.to_string()),
            );
        }

        Ok(())
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self) -> String {
        if let Some(data) = self.data() {
            return data;
        }
        self.descendants()
            .into_iter()
            .filter(|node| node.is_text())
            .filter_map(|node| node.data())
            .collect()
    }

    /// Set character data, or replace an element's children with one text node
    pub fn set_text_content(&self, text: &str) {
        if !self.is_element() {
            // Character data nodes never fail here.
            let _ = self.set_data(text);
            return;
        }
        for child in self.children() {
            self.document.state.borrow_mut().detach(child.id);
        }
        if !text.is_empty() {
            let child = self.document.create_text(text);
            self.document.state.borrow_mut().attach(self.id, child.id);
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.with_data(|data| match &data.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attributes(&self) -> Vec<(String, String)> {
        self.with_data(|data| match &data.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn classes(&self) -> Vec<String> {
        self.attribute("class")
            .map(|class| class.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> DomResult<()> {
        let mut state = self.document.state.borrow_mut();
        match &mut state.nodes[self.id.0].kind {
            NodeKind::Element { attributes, .. } => {
                attributes.insert(name.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(DomError::NotAnElement { node: self.id.0 }),
        }
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        let mut state = self.document.state.borrow_mut();
        match &mut state.nodes[self.id.0].kind {
            NodeKind::Element { attributes, .. } => attributes.shift_remove(name),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    fn check_insertion(&self, child: &Node) -> DomResult<()> {
        self.same_document(child)?;
        if !self.is_element() {
            return Err(DomError::NotAnElement { node: self.id.0 });
        }
        if self
            .document
            .state
            .borrow()
            .is_ancestor_or_self(child.id, self.id)
        {
            return Err(DomError::HierarchyRequest {
                parent: self.id.0,
                child: child.id.0,
            });
        }
        Ok(())
    }

    /// Append `child`, moving it from its current parent if needed
    pub fn append_child(&self, child: &Node) -> DomResult<()> {
        self.check_insertion(child)?;
        let mut state = self.document.state.borrow_mut();
        state.detach(child.id);
        state.attach(self.id, child.id);
        Ok(())
    }

    /// Insert `child` before `reference` (append when `reference` is `None`)
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> DomResult<()> {
        let Some(reference) = reference else {
            return self.append_child(child);
        };
        self.check_insertion(child)?;
        if reference == child {
            return Ok(());
        }
        if reference.parent().as_ref() != Some(self) {
            return Err(DomError::NotAChild {
                parent: self.id.0,
                child: reference.id.0,
            });
        }
        let mut state = self.document.state.borrow_mut();
        state.detach(child.id);
        let children = &mut state.nodes[self.id.0].children;
        let index = children
            .iter()
            .position(|id| *id == reference.id)
            .unwrap_or(children.len());
        children.insert(index, child.id);
        state.nodes[child.id.0].parent = Some(self.id);
        Ok(())
    }

    pub fn remove_child(&self, child: &Node) -> DomResult<()> {
        if child.parent().as_ref() != Some(self) {
            return Err(DomError::NotAChild {
                parent: self.id.0,
                child: child.id.0,
            });
        }
        self.document.state.borrow_mut().detach(child.id);
        Ok(())
    }

    /// Detach from the parent (no-op for detached nodes)
    pub fn remove(&self) {
        self.document.state.borrow_mut().detach(self.id);
    }

    /// Put `replacement` at this node's position and detach this node
    pub fn replace_with(&self, replacement: &Node) -> DomResult<()> {
        let Some(parent) = self.parent() else {
            return Ok(());
        };
        parent.insert_before(replacement, Some(self))?;
        self.remove();
        Ok(())
    }

    /// Copy the node (and its subtree when `deep`). Listeners and observers are
    /// not copied.
    pub fn clone_node(&self, deep: bool) -> Node {
        let kind = self.kind();
        let copy = {
            let mut state = self.document.state.borrow_mut();
            state.push(kind)
        };
        if deep {
            for child in self.children() {
                let child_copy = child.clone_node(true);
                self.document.state.borrow_mut().attach(copy, child_copy.id);
            }
        }
        self.document.node(copy)
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    /// Builder: set an attribute (ignored for non-elements)
    pub fn with_attr(self, name: &str, value: &str) -> Self {
        let _ = self.set_attribute(name, value);
        self
    }

    /// Builder: append a child (ignored when the insertion is invalid)
    pub fn with_child(self, child: Node) -> Self {
        let _ = self.append_child(&child);
        self
    }

    /// Builder: append a text child
    pub fn with_text(self, text: &str) -> Self {
        let child = self.document.create_text(text);
        self.with_child(child)
    }

    // ------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------

    pub fn matches(&self, selector: &str) -> DomResult<bool> {
        Ok(SelectorList::parse(selector)?.matches(self))
    }

    /// Matching descendants (excluding `self`) in document order
    pub fn query_selector_all(&self, selector: &str) -> DomResult<Vec<Node>> {
        let selectors = SelectorList::parse(selector)?;
        Ok(self
            .descendants()
            .into_iter()
            .filter(|node| selectors.matches(node))
            .collect())
    }

    pub fn query_selector(&self, selector: &str) -> DomResult<Option<Node>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    // ------------------------------------------------------------------
    // Events and observation
    // ------------------------------------------------------------------

    /// Register a listener. Returns `None` when the environment has no event
    /// listener support.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        listener: impl Fn(&DomEvent) + 'static,
    ) -> Option<ListenerId> {
        let mut state = self.document.state.borrow_mut();
        if !state.features.event_listeners {
            return None;
        }
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.entry(self.id).or_default().push(ListenerEntry {
            event_type: event_type.to_string(),
            id,
            listener: Rc::new(listener),
        });
        Some(id)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut state = self.document.state.borrow_mut();
        match state.listeners.get_mut(&self.id) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|entry| entry.id != id);
                entries.len() != before
            }
            None => false,
        }
    }

    /// Dispatch an event at this node, bubbling to the root. Returns the number of
    /// listeners invoked.
    pub fn dispatch_event(&self, event_type: &str) -> usize {
        self.dispatch(event_type, None, None)
    }

    fn dispatch(
        &self,
        event_type: &str,
        prev_value: Option<String>,
        new_value: Option<String>,
    ) -> usize {
        let mut path = vec![self.clone()];
        path.extend(self.ancestors());

        let mut invoked = 0;
        for current in path {
            let listeners: Vec<_> = {
                let state = self.document.state.borrow();
                if !state.features.event_listeners {
                    return 0;
                }
                state
                    .listeners
                    .get(&current.id)
                    .map(|entries| {
                        entries
                            .iter()
                            .filter(|entry| entry.event_type == event_type)
                            .map(|entry| Rc::clone(&entry.listener))
                            .collect()
                    })
                    .unwrap_or_default()
            };
            if listeners.is_empty() {
                continue;
            }
            let event = DomEvent {
                event_type: event_type.to_string(),
                target: self.clone(),
                current_target: current.clone(),
                prev_value: prev_value.clone(),
                new_value: new_value.clone(),
            };
            for listener in listeners {
                listener(&event);
                invoked += 1;
            }
        }
        invoked
    }

    /// Observe character-data changes of this node. Returns `false` when the
    /// environment has no native mutation observers.
    pub fn observe_character_data(&self, callback: impl Fn(&MutationRecord) + 'static) -> bool {
        let mut state = self.document.state.borrow_mut();
        if !state.features.mutation_observer {
            return false;
        }
        state
            .observers
            .entry(self.id)
            .or_default()
            .push(Rc::new(callback));
        true
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.document.ptr_eq(&other.document)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(state) = self.document.state.try_borrow() else {
            return write!(f, "Node({})", self.id.0);
        };
        match &state.nodes[self.id.0].kind {
            NodeKind::Element { tag, .. } => write!(f, "Node({} <{}>)", self.id.0, tag),
            NodeKind::Text(text) => write!(f, "Node({} {:?})", self.id.0, text),
            NodeKind::Comment(text) => write!(f, "Node({} <!--{}-->)", self.id.0, text),
        }
    }
}
