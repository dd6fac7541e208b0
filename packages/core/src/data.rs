//! Values held by delegates

use crate::list::List;
use crate::model::Model;
use kontext_common::EventLoop;
use kontext_condition::values_equal;
use serde_json::Value;
use std::fmt;

/// The value of a [`Delegate`](crate::Delegate)
///
/// Raw JSON objects and arrays are accepted as input and promoted to
/// [`Model`]s and [`List`]s once stored.
#[derive(Clone)]
pub enum Data {
    Value(Value),
    Model(Model),
    List(List),
}

impl Data {
    pub fn null() -> Self {
        Data::Value(Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Data::Value(Value::Null))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Data::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Data::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Data::List(list) => Some(list),
            _ => None,
        }
    }

    /// Plain JSON copy, read without emitting `access`
    pub fn snapshot(&self) -> Value {
        match self {
            Data::Value(value) => value.clone(),
            Data::Model(model) => model.snapshot(),
            Data::List(list) => list.snapshot(),
        }
    }

    /// Same model or list instance
    pub fn same_identity(&self, other: &Data) -> bool {
        match (self, other) {
            (Data::Model(a), Data::Model(b)) => a.ptr_eq(b),
            (Data::List(a), Data::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Text written into bound DOM nodes
    pub fn to_text(&self) -> String {
        match self {
            Data::Value(value) => value_text(value),
            Data::Model(model) => model.snapshot().to_string(),
            Data::List(list) => list
                .to_vec()
                .iter()
                .map(Data::to_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Turn raw objects into models and raw arrays into lists
    pub(crate) fn promote(self, event_loop: &EventLoop) -> Data {
        match self {
            Data::Value(Value::Object(map)) => Data::Model(Model::from_map(event_loop, map)),
            Data::Value(Value::Array(items)) => Data::List(List::from_values(event_loop, items)),
            other => other,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            // f64 Display drops the fraction of integral values: 12.0 -> "12"
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

impl PartialEq for Data {
    /// Scalars by value (numbers numerically), models and lists by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Data::Value(a), Data::Value(b)) => values_equal(a, b),
            _ => self.same_identity(other),
        }
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Value(value) => write!(f, "{}", value),
            Data::Model(model) => fmt::Debug::fmt(model, f),
            Data::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

impl Default for Data {
    fn default() -> Self {
        Data::null()
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Data::Value(value)
    }
}

impl From<Model> for Data {
    fn from(model: Model) -> Self {
        Data::Model(model)
    }
}

impl From<&Model> for Data {
    fn from(model: &Model) -> Self {
        Data::Model(model.clone())
    }
}

impl From<List> for Data {
    fn from(list: List) -> Self {
        Data::List(list)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::Value(Value::String(value))
    }
}

impl From<bool> for Data {
    fn from(value: bool) -> Self {
        Data::Value(Value::Bool(value))
    }
}

impl From<i64> for Data {
    fn from(value: i64) -> Self {
        Data::Value(Value::from(value))
    }
}

impl From<i32> for Data {
    fn from(value: i32) -> Self {
        Data::Value(Value::from(value))
    }
}

impl From<usize> for Data {
    fn from(value: usize) -> Self {
        Data::Value(Value::from(value))
    }
}

impl From<f64> for Data {
    fn from(value: f64) -> Self {
        Data::Value(Value::from(value))
    }
}
