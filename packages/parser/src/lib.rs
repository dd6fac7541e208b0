//! # Kontext Parser
//!
//! Turns the relaxed, JavaScript-object-literal-like syntax used in declarative
//! attributes into strict JSON values:
//!
//! ```text
//! each: {target: items, filter: visible}, text: 'Hello, world'
//! ```
//!
//! becomes
//!
//! ```json
//! {"each": {"target": "items", "filter": "visible"}, "text": "Hello, world"}
//! ```
//!
//! Bare identifiers become strings (except `true`, `false` and `null`), the outer
//! braces are optional and trailing commas are tolerated.

pub mod error;
pub mod parser;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use parser::{parse_attribute, parse_value, Parser};
pub use tokenizer::{tokenize, Token};
