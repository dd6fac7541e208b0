use super::{config_field, config_target, greedy, Extension};
use crate::error::{KontextError, KontextResult};
use crate::jit::Jit;
use crate::model::Model;
use kontext_dom::Node;
use serde_json::Value;
use tracing::{debug, warn};

/// Binds an element's text to one delegate
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtension;

impl Extension for TextExtension {
    fn apply(&self, element: &Node, model: &Model, config: &Value, jit: &Jit<'_>) -> KontextResult<()> {
        let target = config_target(config).ok_or_else(|| KontextError::missing_target(jit.extension()))?;
        let initial = config_field(config, "initial").cloned();

        let delegate = match model.delegation(target) {
            Some(delegate) => delegate,
            None if greedy(jit) => {
                debug!(target, "Defining missing key for text binding");
                model.define(target, initial.clone().unwrap_or_else(|| Value::String(String::new())))
            }
            None => {
                warn!(target, "No such key and greedy mode is off; text binding skipped");
                return Ok(());
            }
        };

        if let Some(initial) = initial {
            if delegate.peek().is_null() {
                delegate.set(initial);
            }
        }

        delegate.element([element.clone()]);
        Ok(())
    }
}
