//! Dirty comparison between record and snapshot

use contracts::shared::field_path::{FieldPath, PathToken};
use contracts::shared::form_settings::ComparisonExclusion;
use contracts::shared::json_tree;
use serde_json::{Map, Number, Value};

fn is_excluded(key: &str, value: &Value, exclusions: &[ComparisonExclusion]) -> bool {
    exclusions.iter().any(|exclusion| match exclusion {
        ComparisonExclusion::IgnoreKey(k) => k == key,
        ComparisonExclusion::IgnoreEmpty(k) => {
            k == key && (value.is_null() || value.as_str() == Some(""))
        }
    })
}

fn visible<'a>(
    map: &'a Map<String, Value>,
    exclusions: &'a [ComparisonExclusion],
) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
    map.iter().filter(move |(k, v)| !is_excluded(k, v, exclusions))
}

/// Structural equality that skips excluded keys and compares numbers by value
pub fn equivalent(a: &Value, b: &Value, exclusions: &[ComparisonExclusion]) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            visible(a, exclusions).count() == visible(b, exclusions).count()
                && visible(a, exclusions).all(|(key, left)| {
                    b.get(key)
                        .filter(|right| !is_excluded(key, right, exclusions))
                        .is_some_and(|right| equivalent(left, right, exclusions))
                })
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(left, right)| equivalent(left, right, exclusions))
        }
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => a == b,
    }
}

/// Integers compare exactly; a float on either side compares as f64
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    if a.is_f64() || b.is_f64() {
        if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
            return x == y;
        }
    }
    a == b
}

/// True when `path` resolves to different content in the two trees
pub fn path_differs(
    record: &Value,
    snapshot: &Value,
    path: &FieldPath,
    exclusions: &[ComparisonExclusion],
) -> bool {
    let own_key = match path.last() {
        Some(PathToken::Key(key)) => Some(key.as_str()),
        _ => None,
    };
    let left = json_tree::get(record, path)
        .filter(|value| !own_key.is_some_and(|key| is_excluded(key, value, exclusions)));
    let right = json_tree::get(snapshot, path)
        .filter(|value| !own_key.is_some_and(|key| is_excluded(key, value, exclusions)));

    match (left, right) {
        (None, None) => false,
        (Some(a), Some(b)) => !equivalent(a, b, exclusions),
        _ => true,
    }
}
