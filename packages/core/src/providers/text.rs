use super::Provider;
use crate::settings::{Setting, Settings};
use kontext_dom::Node;
use kontext_parser::parse_value;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

/// Default placeholder syntax: `{key}` or `{key:initial}`
pub const DEFAULT_PATTERN: &str = r"\{(\$?[a-z_]+[.-]?(?:[a-z0-9_]+[.-]?)*)(?::([^}]+))?\}";

/// Turns `{key}` placeholders inside text nodes into `text` bindings
///
/// Each matching text node is split into literal text nodes and one empty
/// placeholder node per match. The placeholders are yielded with
/// `{"text": {"target": key, "initial": value}}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextProvider;

impl TextProvider {
    pub fn defaults() -> Settings {
        Settings::new().with("pattern", DEFAULT_PATTERN)
    }
}

impl Provider for TextProvider {
    fn scan(&self, settings: &Settings, element: &Node, emit: &mut dyn FnMut(Node, Map<String, Value>)) {
        let pattern = match settings.get("pattern").and_then(Setting::to_pattern) {
            Some(Ok(pattern)) => pattern,
            Some(Err(e)) => {
                error!(error = %e, "Invalid placeholder pattern");
                return;
            }
            None => match Regex::new(DEFAULT_PATTERN) {
                Ok(pattern) => pattern,
                Err(e) => {
                    error!(error = %e, "Invalid placeholder pattern");
                    return;
                }
            },
        };

        // Snapshot before any node is split
        let text_nodes: Vec<Node> = std::iter::once(element.clone())
            .chain(element.descendants())
            .filter(Node::is_text)
            .collect();

        for node in text_nodes {
            for (placeholder, config) in split(&pattern, &node) {
                emit(placeholder, config);
            }
        }
    }
}

fn split(pattern: &Regex, node: &Node) -> Vec<(Node, Map<String, Value>)> {
    let Some(text) = node.data() else {
        return Vec::new();
    };
    if !pattern.is_match(&text) {
        return Vec::new();
    }
    let Some(parent) = node.parent() else {
        debug!(node = ?node, "Skipping placeholders in a detached text node");
        return Vec::new();
    };

    let document = node.document();
    let mut pieces = Vec::new();
    let mut bindings = Vec::new();
    let mut cursor = 0;

    for captures in pattern.captures_iter(&text) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            pieces.push(document.create_text(&text[cursor..whole.start()]));
        }

        let mut binding = Map::new();
        binding.insert("target".to_string(), Value::String(key.as_str().to_string()));
        if let Some(initial) = captures.get(2) {
            binding.insert("initial".to_string(), initial_value(initial.as_str()));
        }

        let placeholder = document.create_text("");
        pieces.push(placeholder.clone());
        let mut config = Map::new();
        config.insert("text".to_string(), Value::Object(binding));
        bindings.push((placeholder, config));
        cursor = whole.end();
    }
    if cursor < text.len() {
        pieces.push(document.create_text(&text[cursor..]));
    }

    for piece in &pieces {
        if let Err(e) = parent.insert_before(piece, Some(node)) {
            error!(error = %e, "Failed to split text node");
            return Vec::new();
        }
    }
    node.remove();
    bindings
}

/// `{count:5}` starts as the number 5, `{name:Ada Lovelace}` as a string
fn initial_value(source: &str) -> Value {
    match parse_value(source.trim()) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => value,
        _ => json!(source),
    }
}
