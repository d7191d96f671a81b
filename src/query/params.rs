use serde_json::{Map, Value};

use crate::database::store::{StoreError, StoreResult};

/// Keys that steer the query rather than filter it.
pub const CONTROL_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

/// Operator words accepted in bracket syntax (`price[gte]=10`).
const OPERATOR_WORDS: [&str; 5] = ["gt", "gte", "lt", "lte", "in"];

/// Nest raw query pairs into a JSON object.
///
/// `a[b]=1` becomes `{"a": {"b": "1"}}` and a repeated key collects its values
/// into an array. Values stay strings; typing happens against the collection.
pub fn parse_params(pairs: &[(String, String)]) -> Map<String, Value> {
    let mut root = Map::new();
    for (key, value) in pairs {
        let path = split_key(key);
        if path.is_empty() {
            continue;
        }
        insert_path(&mut root, &path, value.clone());
    }
    root
}

/// `price[gt]` -> ["price", "gt"]. Malformed brackets keep the raw key.
fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return if key.is_empty() { vec![] } else { vec![key.to_string()] };
    };
    let base = &key[..open];
    if base.is_empty() || !key.ends_with(']') {
        return vec![key.to_string()];
    }

    let mut path = vec![base.to_string()];
    for segment in key[open + 1..key.len() - 1].split("][") {
        if segment.is_empty() || segment.contains('[') || segment.contains(']') {
            return vec![key.to_string()];
        }
        path.push(segment.to_string());
    }
    path
}

fn insert_path(map: &mut Map<String, Value>, path: &[String], value: String) {
    let (head, rest) = match path.split_first() {
        Some(split) => split,
        None => return,
    };

    if rest.is_empty() {
        match map.get_mut(head) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing @ Value::String(_)) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            _ => {
                map.insert(head.clone(), Value::String(value));
            }
        }
        return;
    }

    let entry = map.entry(head.clone()).or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        insert_path(child, rest, value);
    }
}

/// Take the control keys out of the parsed parameters. Returns the remaining
/// filter and the control values (first value wins when a key repeats).
pub fn split_control(mut params: Map<String, Value>) -> (Map<String, Value>, Control) {
    let mut take = |key: &str| -> Option<String> {
        match params.remove(key)? {
            Value::String(s) => Some(s),
            Value::Array(items) => items.into_iter().find_map(|v| v.as_str().map(str::to_string)),
            _ => None,
        }
    };
    let control = Control {
        select: take("select"),
        sort: take("sort"),
        page: take("page"),
        limit: take("limit"),
    };
    debug_assert!(CONTROL_KEYS.iter().all(|k| !params.contains_key(*k)));
    (params, control)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Control {
    pub select: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Prefix operator words used as object keys with `$`. Values are left alone,
/// so `name=in` still filters on the literal string "in". Keys that already
/// carry a `$` are refused; only the bracket words reach the operator set.
pub fn rewrite_operators(value: Value) -> StoreResult<Value> {
    Ok(match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                if key.starts_with('$') {
                    return Err(StoreError::UnsupportedOperator(key));
                }
                let key = if OPERATOR_WORDS.contains(&key.as_str()) { format!("${}", key) } else { key };
                out.insert(key, rewrite_operators(child)?);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(rewrite_operators).collect::<StoreResult<_>>()?),
        other => other,
    })
}
