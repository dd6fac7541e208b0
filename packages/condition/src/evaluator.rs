//! Condition evaluation
//!
//! Operators are applied to the value found at a field path. A missing path is
//! represented as `None` and behaves like `undefined`: it only equals `null`, it
//! never orders against anything, and `$exists: false` matches it.
//!
//! Where the field holds an array and the operand is not one, comparison
//! operators match when any element matches.

use crate::error::{ConditionError, ConditionResult};
use crate::path::lookup;
use regex::RegexBuilder;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use tracing::trace;

/// Evaluate a condition against a snapshot
pub fn evaluate(condition: &Value, snapshot: &Value) -> ConditionResult<bool> {
    let result = match condition {
        Value::String(path) => Ok(lookup(snapshot, path).map(is_truthy).unwrap_or(false)),
        Value::Array(conditions) => all(conditions, snapshot),
        Value::Object(entries) => evaluate_document(entries, snapshot),
        scalar => Ok(values_equal(snapshot, scalar)),
    };
    trace!(?condition, ?result, "evaluated condition");
    result
}

/// JavaScript truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Structural equality where numbers compare numerically (`1 == 1.0`)
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, l)| y.get(key).map(|r| values_equal(l, r)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn all(conditions: &[Value], snapshot: &Value) -> ConditionResult<bool> {
    for condition in conditions {
        if !evaluate(condition, snapshot)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any(conditions: &[Value], snapshot: &Value) -> ConditionResult<bool> {
    for condition in conditions {
        if evaluate(condition, snapshot)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn expect_array<'a>(operator: &str, operand: &'a Value) -> ConditionResult<&'a [Value]> {
    operand
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ConditionError::invalid_operand(operator, "expected an array"))
}

fn evaluate_document(entries: &Map<String, Value>, snapshot: &Value) -> ConditionResult<bool> {
    for (key, operand) in entries {
        let matched = match key.as_str() {
            "$and" => all(expect_array(key, operand)?, snapshot)?,
            "$or" => any(expect_array(key, operand)?, snapshot)?,
            "$nor" => !any(expect_array(key, operand)?, snapshot)?,
            "$not" => !evaluate(operand, snapshot)?,
            op if op.starts_with('$') => return Err(ConditionError::unknown_operator(op)),
            path => evaluate_field(lookup(snapshot, path), operand)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_operator_map(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => {
            Some(map)
        }
        _ => None,
    }
}

fn evaluate_field(field: Option<&Value>, operand: &Value) -> ConditionResult<bool> {
    match is_operator_map(operand) {
        Some(operators) => apply_operators(field, operators),
        None => Ok(matches_eq(field, operand)),
    }
}

fn apply_operators(field: Option<&Value>, operators: &Map<String, Value>) -> ConditionResult<bool> {
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => matches_eq(field, operand),
            "$ne" => !matches_eq(field, operand),
            "$gt" => matches_order(field, operand, |o| o == Ordering::Greater),
            "$gte" => matches_order(field, operand, |o| o != Ordering::Less),
            "$lt" => matches_order(field, operand, |o| o == Ordering::Less),
            "$lte" => matches_order(field, operand, |o| o != Ordering::Greater),
            "$in" => expect_array(operator, operand)?
                .iter()
                .any(|candidate| matches_eq(field, candidate)),
            "$nin" => !expect_array(operator, operand)?
                .iter()
                .any(|candidate| matches_eq(field, candidate)),
            "$exists" => field.is_some() == is_truthy(operand),
            "$type" => matches_type(operator, field, operand)?,
            "$mod" => matches_mod(operator, field, operand)?,
            "$regex" => matches_regex(field, operand, operators.get("$options"))?,
            // Modifier of `$regex`
            "$options" => true,
            "$all" => matches_all(operator, field, operand)?,
            "$elemMatch" => matches_elem(field, operand)?,
            "$size" => matches_size(operator, field, operand)?,
            "$not" => !evaluate_field(field, operand)?,
            unknown => return Err(ConditionError::unknown_operator(unknown)),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_eq(field: Option<&Value>, operand: &Value) -> bool {
    match field {
        None => operand.is_null(),
        Some(Value::Array(items)) if !operand.is_array() => {
            items.iter().any(|item| values_equal(item, operand))
        }
        Some(value) => values_equal(value, operand),
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn matches_order(field: Option<&Value>, operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match field {
        None => false,
        Some(Value::Array(items)) if !operand.is_array() => items
            .iter()
            .any(|item| compare(item, operand).map(&accept).unwrap_or(false)),
        Some(value) => compare(value, operand).map(&accept).unwrap_or(false),
    }
}

fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

fn matches_type(operator: &str, field: Option<&Value>, operand: &Value) -> ConditionResult<bool> {
    let actual = type_name(field);
    match operand {
        Value::String(expected) => Ok(expected == actual),
        Value::Array(options) => Ok(options.iter().any(|o| o.as_str() == Some(actual))),
        _ => Err(ConditionError::invalid_operand(
            operator,
            "expected a type name or a list of type names",
        )),
    }
}

fn matches_mod(operator: &str, field: Option<&Value>, operand: &Value) -> ConditionResult<bool> {
    let parts = expect_array(operator, operand)?;
    let (divisor, remainder) = match parts {
        [d, r] => match (d.as_f64(), r.as_f64()) {
            (Some(d), Some(r)) => (d, r),
            _ => {
                return Err(ConditionError::invalid_operand(
                    operator,
                    "divisor and remainder must be numbers",
                ))
            }
        },
        _ => {
            return Err(ConditionError::invalid_operand(
                operator,
                "expected [divisor, remainder]",
            ))
        }
    };
    if divisor == 0.0 {
        return Err(ConditionError::invalid_operand(operator, "divisor is zero"));
    }
    Ok(field
        .and_then(Value::as_f64)
        .map(|value| value % divisor == remainder)
        .unwrap_or(false))
}

fn matches_regex(
    field: Option<&Value>,
    operand: &Value,
    options: Option<&Value>,
) -> ConditionResult<bool> {
    let pattern = operand
        .as_str()
        .ok_or_else(|| ConditionError::invalid_operand("$regex", "expected a pattern string"))?;
    let flags = match options {
        None => "",
        Some(Value::String(flags)) => flags.as_str(),
        Some(_) => {
            return Err(ConditionError::invalid_operand(
                "$options",
                "expected a flag string",
            ))
        }
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(ConditionError::invalid_operand(
                    "$options",
                    format!("unsupported flag '{}'", other),
                ))
            }
        };
    }
    let regex = builder
        .build()
        .map_err(|e| ConditionError::invalid_operand("$regex", e.to_string()))?;

    Ok(match field {
        Some(Value::String(s)) => regex.is_match(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| regex.is_match(s)),
        _ => false,
    })
}

fn matches_all(operator: &str, field: Option<&Value>, operand: &Value) -> ConditionResult<bool> {
    let required = expect_array(operator, operand)?;
    Ok(match field {
        Some(Value::Array(items)) => required
            .iter()
            .all(|wanted| items.iter().any(|item| values_equal(item, wanted))),
        _ => false,
    })
}

fn matches_elem(field: Option<&Value>, operand: &Value) -> ConditionResult<bool> {
    let Some(Value::Array(items)) = field else {
        return Ok(false);
    };
    for item in items {
        let matched = match is_operator_map(operand) {
            Some(operators) => apply_operators(Some(item), operators)?,
            None => evaluate(operand, item)?,
        };
        if matched {
            return Ok(true);
        }
    }
    Ok(false)
}

fn matches_size(operator: &str, field: Option<&Value>, operand: &Value) -> ConditionResult<bool> {
    let expected = operand
        .as_u64()
        .ok_or_else(|| ConditionError::invalid_operand(operator, "expected a non-negative integer"))?;
    Ok(match field {
        Some(Value::Array(items)) => items.len() as u64 == expected,
        _ => false,
    })
}
