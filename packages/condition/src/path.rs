use serde_json::Value;

/// Resolve a dotted path (`user.tags.0`) inside a JSON value
///
/// Objects are entered by key, arrays by numeric index. An empty path resolves to
/// the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
