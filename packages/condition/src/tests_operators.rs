use crate::*;
use serde_json::{json, Value};

fn eval(condition: Value, snapshot: Value) -> bool {
    evaluate(&condition, &snapshot).unwrap()
}

#[test]
fn test_path_truthiness() {
    assert!(eval(json!("a"), json!({"a": 1})));
    assert!(!eval(json!("missingKey"), json!({"a": 1})));
    assert!(!eval(json!("a"), json!({"a": ""})));
    assert!(!eval(json!("a"), json!({"a": 0})));
    assert!(eval(json!("a.b"), json!({"a": {"b": "yes"}})));
    assert!(eval(json!("a"), json!({"a": []})));
}

#[test]
fn test_implicit_equality() {
    assert!(eval(json!({"a": 1}), json!({"a": 1.0})));
    assert!(!eval(json!({"a": 1}), json!({"a": 2})));
    assert!(eval(json!({"a.b": "x"}), json!({"a": {"b": "x"}})));
    assert!(eval(json!({"tags": "red"}), json!({"tags": ["blue", "red"]})));
    assert!(eval(json!({"missing": null}), json!({"a": 1})));
    assert!(eval(json!({"a": {"b": 1}}), json!({"a": {"b": 1}})));
}

#[test]
fn test_comparison_operators() {
    assert!(eval(json!({"a": {"$gt": 3}}), json!({"a": 5})));
    assert!(!eval(json!({"a": {"$gt": 5}}), json!({"a": 5})));
    assert!(eval(json!({"a": {"$gte": 5, "$lt": 10}}), json!({"a": 5})));
    assert!(!eval(json!({"a": {"$gte": 5, "$lt": 10}}), json!({"a": 10})));
    assert!(eval(json!({"a": {"$lte": "b"}}), json!({"a": "a"})));
    assert!(!eval(json!({"a": {"$gt": 3}}), json!({"a": "5"})));
    assert!(!eval(json!({"a": {"$gt": 3}}), json!({})));
    assert!(eval(json!({"a": {"$gt": 3}}), json!({"a": [1, 4]})));
}

#[test]
fn test_equality_operators() {
    assert!(eval(json!({"a": {"$eq": 2}}), json!({"a": 2})));
    assert!(eval(json!({"a": {"$ne": 2}}), json!({"a": 3})));
    assert!(eval(json!({"a": {"$ne": 2}}), json!({})));
    assert!(eval(json!({"a": {"$in": [1, 2, 3]}}), json!({"a": 2})));
    assert!(eval(json!({"a": {"$nin": [1, 2, 3]}}), json!({"a": 4})));
}

#[test]
fn test_logical_combinators() {
    assert!(!eval(
        json!({"$and": [{"a": 1}, {"b": 2}]}),
        json!({"a": 1, "b": 3})
    ));
    assert!(eval(
        json!({"$and": [{"a": 1}, {"b": 2}]}),
        json!({"a": 1, "b": 2})
    ));
    assert!(eval(json!({"$or": [{"a": 2}, {"b": 3}]}), json!({"a": 1, "b": 3})));
    assert!(eval(json!({"$nor": [{"a": 2}, {"b": 2}]}), json!({"a": 1, "b": 3})));
    assert!(eval(json!({"$not": {"a": 2}}), json!({"a": 1})));
    assert!(eval(json!([{"a": 1}, "b"]), json!({"a": 1, "b": true})));
}

#[test]
fn test_field_level_not() {
    assert!(eval(json!({"a": {"$not": {"$gt": 3}}}), json!({"a": 2})));
    assert!(!eval(json!({"a": {"$not": {"$gt": 3}}}), json!({"a": 5})));
}

#[test]
fn test_exists_and_type() {
    assert!(eval(json!({"a": {"$exists": true}}), json!({"a": null})));
    assert!(eval(json!({"b": {"$exists": false}}), json!({"a": 1})));
    assert!(eval(json!({"a": {"$type": "number"}}), json!({"a": 1.5})));
    assert!(eval(json!({"a": {"$type": ["string", "null"]}}), json!({"a": null})));
    assert!(eval(json!({"b": {"$type": "undefined"}}), json!({})));
}

#[test]
fn test_mod_and_size() {
    assert!(eval(json!({"a": {"$mod": [4, 1]}}), json!({"a": 9})));
    assert!(!eval(json!({"a": {"$mod": [4, 1]}}), json!({"a": 8})));
    assert!(eval(json!({"list": {"$size": 2}}), json!({"list": [1, 2]})));
    assert!(!eval(json!({"list": {"$size": 2}}), json!({"list": "ab"})));
}

#[test]
fn test_regex() {
    assert!(eval(json!({"name": {"$regex": "^ad"}}), json!({"name": "ada"})));
    assert!(eval(
        json!({"name": {"$regex": "^AD", "$options": "i"}}),
        json!({"name": "ada"})
    ));
    assert!(!eval(json!({"name": {"$regex": "^AD"}}), json!({"name": "ada"})));
    assert!(eval(json!({"tags": {"$regex": "ed$"}}), json!({"tags": ["blue", "red"]})));
}

#[test]
fn test_array_operators() {
    let snapshot = json!({"tags": ["a", "b", "c"], "items": [{"n": 1}, {"n": 5}], "scores": [2, 8]});
    assert!(eval(json!({"tags": {"$all": ["a", "c"]}}), snapshot.clone()));
    assert!(!eval(json!({"tags": {"$all": ["a", "z"]}}), snapshot.clone()));
    assert!(eval(json!({"items": {"$elemMatch": {"n": {"$gt": 3}}}}), snapshot.clone()));
    assert!(!eval(json!({"items": {"$elemMatch": {"n": {"$gt": 9}}}}), snapshot.clone()));
    assert!(eval(json!({"scores": {"$elemMatch": {"$gt": 5, "$lt": 9}}}), snapshot));
}

#[test]
fn test_scalar_condition_compares_snapshot() {
    assert!(eval(json!(true), json!(true)));
    assert!(!eval(json!(1), json!({"a": 1})));
}

#[test]
fn test_unknown_operator_is_error() {
    assert_eq!(
        evaluate(&json!({"a": {"$near": 1}}), &json!({"a": 1})),
        Err(ConditionError::unknown_operator("$near"))
    );
    assert_eq!(
        evaluate(&json!({"$xor": []}), &json!({})),
        Err(ConditionError::unknown_operator("$xor"))
    );
}

#[test]
fn test_invalid_operands() {
    assert!(matches!(
        evaluate(&json!({"a": {"$in": 3}}), &json!({"a": 3})),
        Err(ConditionError::InvalidOperand { .. })
    ));
    assert!(matches!(
        evaluate(&json!({"a": {"$mod": [0, 1]}}), &json!({"a": 3})),
        Err(ConditionError::InvalidOperand { .. })
    ));
    assert!(matches!(
        evaluate(&json!({"a": {"$regex": "("}}), &json!({"a": "x"})),
        Err(ConditionError::InvalidOperand { .. })
    ));
    assert!(matches!(
        evaluate(&json!({"$and": {"a": 1}}), &json!({"a": 1})),
        Err(ConditionError::InvalidOperand { .. })
    ));
}
