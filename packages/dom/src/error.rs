use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Node {node} is not an element")]
    NotAnElement { node: usize },

    #[error("Node {node} does not hold character data")]
    NotCharacterData { node: usize },

    #[error("Node {child} is not a child of node {parent}")]
    NotAChild { parent: usize, child: usize },

    #[error("Inserting node {child} into node {parent} would create a cycle")]
    HierarchyRequest { parent: usize, child: usize },

    #[error("Nodes belong to different documents")]
    WrongDocument,
}

impl DomError {
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}
