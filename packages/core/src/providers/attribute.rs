use super::Provider;
use crate::settings::Settings;
use kontext_dom::Node;
use kontext_parser::parse_attribute;
use serde_json::{Map, Value};
use tracing::{error, trace};

pub(crate) const DEFAULT_ATTRIBUTE: &str = "data-kontext";

/// Reads binding configuration from the `attribute` setting (`data-kontext`)
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeProvider;

impl AttributeProvider {
    pub fn defaults() -> Settings {
        Settings::new().with("attribute", DEFAULT_ATTRIBUTE)
    }
}

impl Provider for AttributeProvider {
    fn scan(&self, settings: &Settings, element: &Node, emit: &mut dyn FnMut(Node, Map<String, Value>)) {
        let attribute = settings.get_str("attribute").unwrap_or(DEFAULT_ATTRIBUTE);

        let candidates = std::iter::once(element.clone())
            .chain(element.descendants())
            .filter(|node| node.has_attribute(attribute));

        for node in candidates {
            let Some(source) = node.attribute(attribute) else {
                continue;
            };
            match parse_attribute(&source) {
                Ok(config) => {
                    trace!(node = ?node, extensions = config.len(), "Found binding attribute");
                    emit(node, config);
                }
                Err(e) => {
                    error!(attribute, source = %source, pos = e.pos(), error = %e, "Unparsable binding attribute");
                }
            }
        }
    }
}
