//! Nested key-path settings store
//!
//! Dotted keys (`"features.mutationObserver"`) address nested maps. Merging is
//! deep for maps only; lists and patterns are replaced wholesale.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// A single settings value
#[derive(Clone)]
pub enum Setting {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Pattern(Regex),
    List(Vec<Setting>),
    Map(IndexMap<String, Setting>),
}

impl Setting {
    /// Only maps merge recursively
    pub fn is_inheritable(&self) -> bool {
        matches!(self, Setting::Map(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Setting::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Setting::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Setting::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Setting]> {
        match self {
            Setting::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Setting>> {
        match self {
            Setting::Map(map) => Some(map),
            _ => None,
        }
    }

    /// A compiled pattern, or a string compiled on the fly
    pub fn to_pattern(&self) -> Option<Result<Regex, regex::Error>> {
        match self {
            Setting::Pattern(regex) => Some(Ok(regex.clone())),
            Setting::String(source) => Some(Regex::new(source)),
            _ => None,
        }
    }

    /// JSON form; patterns become their source string
    pub fn to_value(&self) -> Value {
        match self {
            Setting::Null => Value::Null,
            Setting::Bool(b) => Value::Bool(*b),
            Setting::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Setting::String(s) => Value::String(s.clone()),
            Setting::Pattern(regex) => Value::String(regex.as_str().to_string()),
            Setting::List(items) => Value::Array(items.iter().map(Setting::to_value).collect()),
            Setting::Map(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Setting {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Setting::Null, Setting::Null) => true,
            (Setting::Bool(a), Setting::Bool(b)) => a == b,
            (Setting::Number(a), Setting::Number(b)) => a == b,
            (Setting::String(a), Setting::String(b)) => a == b,
            (Setting::Pattern(a), Setting::Pattern(b)) => a.as_str() == b.as_str(),
            (Setting::List(a), Setting::List(b)) => a == b,
            (Setting::Map(a), Setting::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Null => write!(f, "null"),
            Setting::Bool(b) => write!(f, "{}", b),
            Setting::Number(n) => write!(f, "{}", n),
            Setting::String(s) => write!(f, "{:?}", s),
            Setting::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
            Setting::List(items) => f.debug_list().entries(items).finish(),
            Setting::Map(map) => f.debug_map().entries(map.iter()).finish(),
        }
    }
}

impl From<bool> for Setting {
    fn from(value: bool) -> Self {
        Setting::Bool(value)
    }
}

impl From<f64> for Setting {
    fn from(value: f64) -> Self {
        Setting::Number(value)
    }
}

impl From<i64> for Setting {
    fn from(value: i64) -> Self {
        Setting::Number(value as f64)
    }
}

impl From<&str> for Setting {
    fn from(value: &str) -> Self {
        Setting::String(value.to_string())
    }
}

impl From<String> for Setting {
    fn from(value: String) -> Self {
        Setting::String(value)
    }
}

impl From<Regex> for Setting {
    fn from(value: Regex) -> Self {
        Setting::Pattern(value)
    }
}

impl<T: Into<Setting>> From<Vec<T>> for Setting {
    fn from(items: Vec<T>) -> Self {
        Setting::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Settings> for Setting {
    fn from(settings: Settings) -> Self {
        Setting::Map(settings.root)
    }
}

impl From<Value> for Setting {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Setting::Null,
            Value::Bool(b) => Setting::Bool(b),
            Value::Number(n) => n.as_f64().map(Setting::Number).unwrap_or(Setting::Null),
            Value::String(s) => Setting::String(s),
            Value::Array(items) => Setting::List(items.into_iter().map(Setting::from).collect()),
            Value::Object(map) => Setting::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Setting::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Root map of a settings store
#[derive(Clone, Default, PartialEq)]
pub struct Settings {
    root: IndexMap<String, Setting>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Settings::set`]
    pub fn with(mut self, path: &str, value: impl Into<Setting>) -> Self {
        self.set(path, value);
        self
    }

    /// Walk a dotted path
    pub fn get(&self, path: &str) -> Option<&Setting> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.root.get(first)?, |current, segment| {
            current.as_map()?.get(segment)
        })
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Setting::as_bool)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Setting::as_str)
    }

    /// String entries of a list setting
    pub fn get_strings(&self, path: &str) -> Vec<String> {
        self.get(path)
            .and_then(Setting::as_list)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Expand `path` into nested maps, deep-merge it and return the stored value
    pub fn set(&mut self, path: &str, value: impl Into<Setting>) -> Setting {
        let value = value.into();
        let patch = path
            .rsplit('.')
            .fold(value, |inner, segment| {
                Setting::Map(IndexMap::from([(segment.to_string(), inner)]))
            });
        if let Setting::Map(patch) = patch {
            merge_maps(&mut self.root, patch);
        }
        self.get(path).cloned().unwrap_or(Setting::Null)
    }

    /// Deep merge `patch` into this store
    pub fn merge(&mut self, patch: Settings) {
        merge_maps(&mut self.root, patch.root);
    }

    /// A fresh copy of this store with `overrides` merged in
    pub fn combine(&self, overrides: &Settings) -> Settings {
        let mut combined = self.clone();
        combined.merge(overrides.clone());
        combined
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Setting::Map(self.root.clone()).to_value()
    }
}

fn merge_maps(target: &mut IndexMap<String, Setting>, patch: IndexMap<String, Setting>) {
    for (key, incoming) in patch {
        match (target.get_mut(&key), incoming) {
            (Some(Setting::Map(existing)), Setting::Map(incoming)) => merge_maps(existing, incoming),
            (_, incoming) => {
                target.insert(key, incoming);
            }
        }
    }
}

impl From<Value> for Settings {
    /// Objects become the root map; any other value yields an empty store
    fn from(value: Value) -> Self {
        match Setting::from(value) {
            Setting::Map(root) => Settings { root },
            _ => Settings::default(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.root.iter()).finish()
    }
}
