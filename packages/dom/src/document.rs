use crate::error::DomResult;
use crate::events::{DomEvent, ListenerId, MutationRecord};
use crate::features::Features;
use crate::node::{Node, NodeId, NodeKind};
use crate::selector::SelectorList;
use indexmap::IndexMap;
use kontext_common::EventLoop;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub(crate) type ListenerFn = Rc<dyn Fn(&DomEvent)>;
pub(crate) type ObserverFn = Rc<dyn Fn(&MutationRecord)>;

pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

pub(crate) struct ListenerEntry {
    pub event_type: String,
    pub id: ListenerId,
    pub listener: ListenerFn,
}

pub(crate) struct DocumentState {
    pub nodes: Vec<NodeData>,
    pub root: NodeId,
    pub head: NodeId,
    pub body: NodeId,
    pub features: Features,
    pub listeners: HashMap<NodeId, Vec<ListenerEntry>>,
    pub observers: HashMap<NodeId, Vec<ObserverFn>>,
    pub next_listener: u64,
}

impl DocumentState {
    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != child);
        }
    }

    pub fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    pub fn descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[id.0].children {
            out.push(*child);
            self.descendants(*child, out);
        }
    }
}

/// Document handle (cheap to clone, shares the same tree)
///
/// A fresh document contains `html > (head, body)`.
#[derive(Clone)]
pub struct Document {
    pub(crate) state: Rc<RefCell<DocumentState>>,
    event_loop: EventLoop,
}

impl Document {
    pub fn new(event_loop: EventLoop) -> Self {
        Self::with_features(event_loop, Features::all())
    }

    pub fn with_features(event_loop: EventLoop, features: Features) -> Self {
        let mut state = DocumentState {
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            features,
            listeners: HashMap::new(),
            observers: HashMap::new(),
            next_listener: 0,
        };
        let root = state.push(element_kind("html"));
        let head = state.push(element_kind("head"));
        let body = state.push(element_kind("body"));
        state.attach(root, head);
        state.attach(root, body);
        state.root = root;
        state.head = head;
        state.body = body;

        Self {
            state: Rc::new(RefCell::new(state)),
            event_loop,
        }
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    pub fn features(&self) -> Features {
        self.state.borrow().features
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub fn node(&self, id: NodeId) -> Node {
        Node::new(self.clone(), id)
    }

    pub fn document_element(&self) -> Node {
        let id = self.state.borrow().root;
        self.node(id)
    }

    pub fn head(&self) -> Node {
        let id = self.state.borrow().head;
        self.node(id)
    }

    pub fn body(&self) -> Node {
        let id = self.state.borrow().body;
        self.node(id)
    }

    pub fn create_element(&self, tag: impl Into<String>) -> Node {
        let id = self.state.borrow_mut().push(element_kind(tag));
        self.node(id)
    }

    pub fn create_text(&self, data: impl Into<String>) -> Node {
        let id = self.state.borrow_mut().push(NodeKind::Text(data.into()));
        self.node(id)
    }

    pub fn create_comment(&self, data: impl Into<String>) -> Node {
        let id = self.state.borrow_mut().push(NodeKind::Comment(data.into()));
        self.node(id)
    }

    /// All elements in the document matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &str) -> DomResult<Vec<Node>> {
        let selectors = SelectorList::parse(selector)?;
        let root = self.document_element();
        let mut matches = Vec::new();
        if selectors.matches(&root) {
            matches.push(root.clone());
        }
        matches.extend(
            root.descendants()
                .into_iter()
                .filter(|node| selectors.matches(node)),
        );
        Ok(matches)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
        let root = self.document_element();
        root.descendants()
            .into_iter()
            .find(|node| node.attribute("id").as_deref() == Some(id))
    }

    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Document")
                .field("nodes", &state.nodes.len())
                .field("features", &state.features)
                .finish(),
            Err(_) => f.write_str("Document { <borrowed> }"),
        }
    }
}

fn element_kind(tag: impl Into<String>) -> NodeKind {
    NodeKind::Element {
        tag: tag.into().to_ascii_lowercase(),
        attributes: IndexMap::new(),
    }
}
