use super::Extension;
use crate::delegate::Change;
use crate::error::KontextResult;
use crate::jit::Jit;
use crate::model::Model;
use kontext_condition::evaluate;
use kontext_dom::Node;
use serde_json::Value;
use tracing::{debug, error};

pub(crate) const PLACEHOLDER_TEXT: &str = "kontext conditional";

/// Shows an element only while its condition holds against the model
///
/// A hidden element is swapped for a comment placeholder at the same position.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalExtension;

impl Extension for ConditionalExtension {
    fn apply(&self, element: &Node, model: &Model, config: &Value, jit: &Jit<'_>) -> KontextResult<()> {
        jit.stop_descend();

        let children = element.children();
        if !children.is_empty() {
            jit.kontext()
                .bind(model, children, Some(jit.settings().clone()))?;
        }

        let toggle = Toggle {
            element: element.clone(),
            placeholder: element.document().create_comment(PLACEHOLDER_TEXT),
        };
        toggle.show(evaluate(config, &model.snapshot())?)?;

        let condition = config.clone();
        let weak = model.downgrade();
        model.on("update", move |_: &Change| {
            let Some(model) = weak.upgrade() else {
                return;
            };
            let result = evaluate(&condition, &model.snapshot())
                .map_err(Into::into)
                .and_then(|visible| toggle.show(visible));
            if let Err(e) = result {
                error!(error = %e, "Conditional binding failed");
            }
        });
        Ok(())
    }
}

struct Toggle {
    element: Node,
    placeholder: Node,
}

impl Toggle {
    fn show(&self, visible: bool) -> KontextResult<()> {
        if visible && self.placeholder.parent().is_some() {
            debug!("Showing conditional element");
            self.placeholder.replace_with(&self.element)?;
        } else if !visible && self.element.parent().is_some() {
            debug!("Hiding conditional element");
            self.element.replace_with(&self.placeholder)?;
        }
        Ok(())
    }
}
