//! # Kontext Condition
//!
//! Evaluates MongoDB-style predicates against a JSON snapshot of a model.
//!
//! ```rust,ignore
//! use kontext_condition::evaluate;
//! use serde_json::json;
//!
//! assert!(evaluate(&json!({"a": {"$gt": 3}}), &json!({"a": 5}))?);
//! ```
//!
//! A condition is one of:
//!
//! - a string: the dotted path must exist and hold a truthy value
//! - any other scalar: compared for equality with the snapshot itself
//! - an array: every element must hold (implicit `$and`)
//! - an object: every entry must hold; keys are either logical combinators
//!   (`$and`, `$or`, `$nor`, `$not`) or dotted paths whose value is either an
//!   operator map (`{"$gte": 1, "$lt": 10}`) or a value tested with implicit `$eq`
//!
//! Unknown operators are errors, never silently false.

pub mod error;
pub mod evaluator;
pub mod path;

#[cfg(test)]
mod tests_operators;

pub use error::{ConditionError, ConditionResult};
pub use evaluator::{evaluate, is_truthy, values_equal};
pub use path::lookup;
