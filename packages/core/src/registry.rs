//! Named handler registries with prefix abbreviation

use indexmap::IndexMap;

/// Outcome of looking a name up in a [`Registry`]
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<H> {
    Exact { name: String, handler: H },
    /// `name` is the unique registered name starting with the requested one
    Abbreviated { name: String, handler: H },
    Unknown,
    Ambiguous(Vec<String>),
}

impl<H> Resolution<H> {
    pub fn handler(&self) -> Option<(&str, &H)> {
        match self {
            Resolution::Exact { name, handler } | Resolution::Abbreviated { name, handler } => {
                Some((name.as_str(), handler))
            }
            Resolution::Unknown | Resolution::Ambiguous(_) => None,
        }
    }
}

/// Ordered name → handler map
#[derive(Debug, Clone)]
pub struct Registry<H> {
    entries: IndexMap<String, H>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<H: Clone> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`, replacing any previous one of the same name
    pub fn insert(&mut self, name: impl Into<String>, handler: H) -> Option<H> {
        self.entries.insert(name.into(), handler)
    }

    pub fn get(&self, name: &str) -> Option<&H> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Exact match first; otherwise, when `abbreviate` is set, the single name
    /// that starts with `name`
    pub fn resolve(&self, name: &str, abbreviate: bool) -> Resolution<H> {
        if let Some(handler) = self.entries.get(name) {
            return Resolution::Exact {
                name: name.to_string(),
                handler: handler.clone(),
            };
        }
        if !abbreviate || name.is_empty() {
            return Resolution::Unknown;
        }

        let candidates: Vec<(&String, &H)> = self
            .entries
            .iter()
            .filter(|(registered, _)| registered.starts_with(name))
            .collect();
        match candidates.as_slice() {
            [] => Resolution::Unknown,
            [(registered, handler)] => Resolution::Abbreviated {
                name: (*registered).clone(),
                handler: (*handler).clone(),
            },
            _ => Resolution::Ambiguous(candidates.iter().map(|(n, _)| (*n).clone()).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry<u8> {
        let mut registry = Registry::new();
        registry.insert("conditional", 1);
        registry.insert("css", 2);
        registry.insert("each", 3);
        registry.insert("event", 4);
        registry
    }

    #[test]
    fn test_exact_beats_abbreviation() {
        let mut registry = registry();
        registry.insert("e", 9);
        assert_eq!(
            registry.resolve("e", true),
            Resolution::Exact { name: "e".into(), handler: 9 }
        );
    }

    #[test]
    fn test_unique_prefix() {
        assert_eq!(
            registry().resolve("cond", true),
            Resolution::Abbreviated { name: "conditional".into(), handler: 1 }
        );
        assert_eq!(registry().resolve("cond", false), Resolution::Unknown);
    }

    #[test]
    fn test_ambiguous_prefix_lists_candidates() {
        assert_eq!(
            registry().resolve("e", true),
            Resolution::Ambiguous(vec!["each".into(), "event".into()])
        );
    }

    #[test]
    fn test_unknown() {
        let resolution = registry().resolve("bogus", true);
        assert_eq!(resolution, Resolution::Unknown);
        assert!(resolution.handler().is_none());
    }
}
