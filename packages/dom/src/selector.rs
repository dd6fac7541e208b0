//! Minimal CSS selector support
//!
//! Grammar: a comma-separated list of complex selectors; a complex selector is a
//! whitespace-separated (descendant) chain of compound selectors; a compound
//! selector is an optional tag or `*` followed by any number of `#id`, `.class`,
//! `[attr]` and `[attr=value]` parts.

use crate::error::{DomError, DomResult};
use crate::node::Node;

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        let Some(tag) = node.tag_name() else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if *expected != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let classes = node.classes();
            if !self.classes.iter().all(|class| classes.contains(class)) {
                return false;
            }
        }
        self.attributes.iter().all(|(name, value)| match value {
            Some(expected) => node.attribute(name).as_deref() == Some(expected.as_str()),
            None => node.has_attribute(name),
        })
    }
}

/// Descendant chain, stored left to right
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    parts: Vec<Compound>,
}

impl Complex {
    fn matches(&self, node: &Node) -> bool {
        let Some((last, rest)) = self.parts.split_last() else {
            return false;
        };
        if !last.matches(node) {
            return false;
        }
        // Greedy right-to-left walk over the ancestor chain
        let mut ancestors = node.ancestors().into_iter();
        for part in rest.iter().rev() {
            if !ancestors.any(|ancestor| part.matches(&ancestor)) {
                return false;
            }
        }
        true
    }
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(source: &str) -> DomResult<Self> {
        let mut selectors = Vec::new();
        for group in source.split(',') {
            let group = group.trim();
            if group.is_empty() {
                return Err(DomError::invalid_selector(source, "empty selector"));
            }
            let parts = group
                .split_whitespace()
                .map(|part| parse_compound(source, part))
                .collect::<DomResult<Vec<_>>>()?;
            selectors.push(Complex { parts });
        }
        Ok(Self { selectors })
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.selectors.iter().any(|selector| selector.matches(node))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(source: &str, part: &str) -> DomResult<Compound> {
    let mut compound = Compound::default();
    let chars: Vec<char> = part.chars().collect();
    let mut pos = 0;

    let read_name = |pos: &mut usize| -> DomResult<String> {
        let start = *pos;
        while *pos < chars.len() && is_name_char(chars[*pos]) {
            *pos += 1;
        }
        if start == *pos {
            return Err(DomError::invalid_selector(
                source,
                format!("expected a name at offset {} of '{}'", start, part),
            ));
        }
        Ok(chars[start..*pos].iter().collect())
    };

    if pos < chars.len() && chars[pos] == '*' {
        pos += 1;
    } else if pos < chars.len() && is_name_char(chars[pos]) {
        compound.tag = Some(read_name(&mut pos)?.to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                compound.id = Some(read_name(&mut pos)?);
            }
            '.' => {
                pos += 1;
                compound.classes.push(read_name(&mut pos)?);
            }
            '[' => {
                let close = chars[pos..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| pos + offset)
                    .ok_or_else(|| DomError::invalid_selector(source, "unclosed '['"))?;
                let inner: String = chars[pos + 1..close].iter().collect();
                let attribute = match inner.split_once('=') {
                    Some((name, value)) => (
                        name.trim().to_string(),
                        Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                    ),
                    None => (inner.trim().to_string(), None),
                };
                if attribute.0.is_empty() {
                    return Err(DomError::invalid_selector(source, "empty attribute name"));
                }
                compound.attributes.push(attribute);
                pos = close + 1;
            }
            other => {
                return Err(DomError::invalid_selector(
                    source,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(compound)
}
