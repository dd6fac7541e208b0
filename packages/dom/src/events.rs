use crate::node::Node;

/// Legacy mutation event fired synchronously when character data changes
pub const CHARACTER_DATA_MODIFIED: &str = "DOMCharacterDataModified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Event delivered to listeners
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub event_type: String,
    pub target: Node,
    /// Node whose listener is being invoked (differs from `target` while bubbling)
    pub current_target: Node,
    pub prev_value: Option<String>,
    pub new_value: Option<String>,
}

/// Character-data change delivered to observers
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub target: Node,
    pub old_value: String,
    pub value: String,
}
