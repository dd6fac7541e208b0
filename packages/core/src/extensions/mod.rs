//! Extensions turn one binding configuration into live behaviour

mod conditional;
mod each;
mod text;

pub use conditional::ConditionalExtension;
pub use each::EachExtension;
pub use text::TextExtension;

use crate::error::KontextResult;
use crate::jit::Jit;
use crate::model::Model;
use kontext_dom::Node;
use serde_json::Value;

pub trait Extension {
    fn apply(&self, element: &Node, model: &Model, config: &Value, jit: &Jit<'_>) -> KontextResult<()>;
}

impl<F> Extension for F
where
    F: Fn(&Node, &Model, &Value, &Jit<'_>) -> KontextResult<()>,
{
    fn apply(&self, element: &Node, model: &Model, config: &Value, jit: &Jit<'_>) -> KontextResult<()> {
        self(element, model, config, jit)
    }
}

/// `"key"` or `{target: "key", ...}`
fn config_target(config: &Value) -> Option<&str> {
    match config {
        Value::String(target) => Some(target),
        Value::Object(map) => map.get("target").and_then(Value::as_str),
        _ => None,
    }
}

fn config_field<'a>(config: &'a Value, field: &str) -> Option<&'a Value> {
    match config {
        Value::Object(map) => map.get(field),
        _ => None,
    }
}

fn greedy(jit: &Jit<'_>) -> bool {
    jit.settings().get_bool("greedy").unwrap_or(true)
}
