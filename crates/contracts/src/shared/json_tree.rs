//! Read/write access to a `serde_json::Value` tree by [`FieldPath`]

use serde_json::{Map, Value};
use thiserror::Error;

use super::field_path::{FieldPath, PathPattern, PathToken, PatternToken};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("parent of '{0}' does not exist")]
    MissingParent(FieldPath),

    #[error("parent of '{0}' is not an object or array")]
    NotAContainer(FieldPath),

    #[error("'{0}' addresses an array with a non-numeric key")]
    KeyOnArray(FieldPath),

    #[error("index out of bounds at '{path}' (length {len})")]
    IndexOutOfBounds { path: FieldPath, len: usize },
}

fn child<'a>(value: &'a Value, token: &PathToken) -> Option<&'a Value> {
    match (value, token) {
        (Value::Object(map), PathToken::Key(k)) => map.get(k),
        (Value::Object(map), PathToken::Index(i)) => map.get(&i.to_string()),
        (Value::Array(items), token) => token.as_index().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, token: &PathToken) -> Option<&'a mut Value> {
    match (value, token) {
        (Value::Object(map), PathToken::Key(k)) => map.get_mut(k),
        (Value::Object(map), PathToken::Index(i)) => map.get_mut(&i.to_string()),
        (Value::Array(items), token) => token.as_index().and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Value at `path`, `None` when any step is missing
pub fn get<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.tokens()
        .iter()
        .try_fold(root, |current, token| child(current, token))
}

pub fn get_mut<'a>(root: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    let mut current = root;
    for token in path.tokens() {
        current = child_mut(current, token)?;
    }
    Some(current)
}

pub fn contains(root: &Value, path: &FieldPath) -> bool {
    get(root, path).is_some()
}

/// Write `value` at `path` and return the previous value.
///
/// The parent must already exist. Objects accept any key; arrays accept an
/// existing index or `len` (append). The root path replaces the whole tree.
pub fn assign(root: &mut Value, path: &FieldPath, value: Value) -> Result<Option<Value>, AssignError> {
    let Some((last, parent_path)) = path.split_last() else {
        return Ok(Some(std::mem::replace(root, value)));
    };
    let parent =
        get_mut(root, &parent_path).ok_or_else(|| AssignError::MissingParent(path.clone()))?;

    match parent {
        Value::Object(map) => {
            let key = match last {
                PathToken::Key(k) => k.clone(),
                PathToken::Index(i) => i.to_string(),
            };
            Ok(map.insert(key, value))
        }
        Value::Array(items) => {
            let index = last
                .as_index()
                .ok_or_else(|| AssignError::KeyOnArray(path.clone()))?;
            if index < items.len() {
                Ok(Some(std::mem::replace(&mut items[index], value)))
            } else if index == items.len() {
                items.push(value);
                Ok(None)
            } else {
                Err(AssignError::IndexOutOfBounds {
                    path: path.clone(),
                    len: items.len(),
                })
            }
        }
        _ => Err(AssignError::NotAContainer(path.clone())),
    }
}

/// Whether [`assign`] would accept `path`, without writing
pub fn is_assignable(root: &Value, path: &FieldPath) -> bool {
    let Some((last, parent_path)) = path.split_last() else {
        return true;
    };
    match get(root, &parent_path) {
        Some(Value::Object(_)) => true,
        Some(Value::Array(items)) => last.as_index().is_some_and(|i| i <= items.len()),
        _ => false,
    }
}

/// Remove the value at `path`; array elements after it shift down
pub fn remove(root: &mut Value, path: &FieldPath) -> Option<Value> {
    let (last, parent_path) = path.split_last()?;
    match get_mut(root, &parent_path)? {
        Value::Object(map) => match last {
            PathToken::Key(k) => map.remove(k),
            PathToken::Index(i) => map.remove(&i.to_string()),
        },
        Value::Array(items) => {
            let index = last.as_index()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

/// Write `value` at `path`, creating intermediate containers on the way.
/// Arrays are padded with `null` up to the addressed index.
pub fn insert_creating(root: &mut Value, path: &FieldPath, value: Value) -> Result<(), AssignError> {
    let mut current = root;
    for (depth, token) in path.tokens().iter().enumerate() {
        if current.is_null() {
            *current = match token {
                PathToken::Key(_) => Value::Object(Map::new()),
                PathToken::Index(_) => Value::Array(Vec::new()),
            };
        }
        current = match (current, token) {
            (Value::Object(map), PathToken::Key(k)) => map.entry(k.clone()).or_insert(Value::Null),
            (Value::Object(map), PathToken::Index(i)) => {
                map.entry(i.to_string()).or_insert(Value::Null)
            }
            (Value::Array(items), PathToken::Index(i)) => {
                if items.len() <= *i {
                    items.resize(*i + 1, Value::Null);
                }
                &mut items[*i]
            }
            (Value::Array(_), PathToken::Key(_)) => {
                return Err(AssignError::KeyOnArray(path.prefix(depth + 1)))
            }
            _ => return Err(AssignError::NotAContainer(path.prefix(depth + 1))),
        };
    }
    *current = value;
    Ok(())
}

/// Empty container of the same kind as `value` (`null` for scalars)
pub fn empty_like(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::Object(Map::new()),
        Value::Array(_) => Value::Array(Vec::new()),
        _ => Value::Null,
    }
}

/// Build a tree holding only the subtrees addressed by `paths`.
///
/// Positions are kept: unaddressed array siblings become `null`, and every
/// array keeps the length it has in `root`. Paths that do not resolve in
/// `root` are skipped.
pub fn extract(root: &Value, paths: &[FieldPath]) -> Result<Value, AssignError> {
    if paths.iter().any(FieldPath::is_root) {
        return Ok(root.clone());
    }
    let mut out = empty_like(root);
    for path in paths {
        if let Some(value) = get(root, path) {
            insert_creating(&mut out, path, value.clone())?;
        }
    }
    pad_arrays(&mut out, root);
    Ok(out)
}

fn pad_arrays(out: &mut Value, source: &Value) {
    match (out, source) {
        (Value::Array(items), Value::Array(source)) => {
            if items.len() < source.len() {
                items.resize(source.len(), Value::Null);
            }
            for (item, from) in items.iter_mut().zip(source) {
                pad_arrays(item, from);
            }
        }
        (Value::Object(map), Value::Object(source)) => {
            for (key, item) in map.iter_mut() {
                if let Some(from) = source.get(key) {
                    pad_arrays(item, from);
                }
            }
        }
        _ => {}
    }
}

/// Concrete paths in `root` matched by `pattern`
pub fn expand_pattern(root: &Value, pattern: &PathPattern) -> Vec<FieldPath> {
    fn walk(value: &Value, rest: &[PatternToken], at: FieldPath, out: &mut Vec<FieldPath>) {
        let Some((head, tail)) = rest.split_first() else {
            out.push(at);
            return;
        };
        match head {
            PatternToken::AnyIndex => {
                if let Value::Array(items) = value {
                    for (i, item) in items.iter().enumerate() {
                        walk(item, tail, at.child_index(i), out);
                    }
                }
            }
            PatternToken::Key(k) => {
                let token = PathToken::Key(k.clone());
                if let Some(next) = child(value, &token) {
                    walk(next, tail, at.child_key(k.clone()), out);
                }
            }
            PatternToken::Index(i) => {
                if let Some(next) = child(value, &PathToken::Index(*i)) {
                    walk(next, tail, at.child_index(*i), out);
                }
            }
        }
    }

    let mut out = Vec::new();
    walk(root, pattern.tokens(), FieldPath::root(), &mut out);
    out
}

/// Copy the top-level keys of `source` into `target` (both objects)
pub fn merge_top_level(target: &mut Value, source: &Value) -> bool {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_get_nested() {
        let record = json!({"sectors": [{"code": 1, "pct": 50}], "title": "x"});
        assert_eq!(get(&record, &path("sectors[0].pct")), Some(&json!(50)));
        assert_eq!(get(&record, &path("title")), Some(&json!("x")));
        assert_eq!(get(&record, &path("sectors[1].pct")), None);
        assert_eq!(get(&record, &path("title.x")), None);
        assert_eq!(get(&record, &FieldPath::root()), Some(&record));
    }

    #[test]
    fn test_assign_rules() {
        let mut record = json!({"sectors": [{"code": 1}], "title": "x"});

        let previous = assign(&mut record, &path("sectors[0].code"), json!(2)).unwrap();
        assert_eq!(previous, Some(json!(1)));

        assert_eq!(assign(&mut record, &path("description"), json!("d")).unwrap(), None);
        assert_eq!(record["description"], json!("d"));

        assign(&mut record, &path("sectors[1]"), json!({"code": 3})).unwrap();
        assert_eq!(record["sectors"].as_array().unwrap().len(), 2);

        assert_eq!(
            assign(&mut record, &path("sectors[5]"), json!({})),
            Err(AssignError::IndexOutOfBounds {
                path: path("sectors[5]"),
                len: 2
            })
        );
        assert_eq!(
            assign(&mut record, &path("missing.child"), json!(1)),
            Err(AssignError::MissingParent(path("missing.child")))
        );
        assert_eq!(
            assign(&mut record, &path("title.child"), json!(1)),
            Err(AssignError::NotAContainer(path("title.child")))
        );
        assert!(!is_assignable(&record, &path("title.child")));
        assert!(is_assignable(&record, &path("sectors[2]")));
        assert!(!is_assignable(&record, &path("sectors[3]")));
    }

    #[test]
    fn test_remove_shifts_array() {
        let mut record = json!({"rows": [1, 2, 3], "a": {"b": 1}});
        assert_eq!(remove(&mut record, &path("rows[0]")), Some(json!(1)));
        assert_eq!(record["rows"], json!([2, 3]));
        assert_eq!(remove(&mut record, &path("a.b")), Some(json!(1)));
        assert_eq!(remove(&mut record, &path("a.b")), None);
        assert_eq!(remove(&mut record, &FieldPath::root()), None);
    }

    #[test]
    fn test_extract_partial_payload() {
        let record = json!({
            "id": 7,
            "title": "t",
            "sectors": [{"code": 1, "pct": 50}, {"code": 2, "pct": 50}]
        });

        let payload = extract(&record, &[path("sectors")]).unwrap();
        assert_eq!(payload, json!({"sectors": record["sectors"].clone()}));

        let payload = extract(&record, &[path("sectors[1].pct"), path("title")]).unwrap();
        assert_eq!(payload, json!({"title": "t", "sectors": [null, {"pct": 50}]}));

        let payload = extract(&record, &[path("sectors[0].code")]).unwrap();
        assert_eq!(payload, json!({"sectors": [{"code": 1}, null]}));

        let array_root = json!([{"value": 1}, {"value": 2}, {"value": 3}]);
        let payload = extract(&array_root, &[path("[1].value")]).unwrap();
        assert_eq!(payload, json!([null, {"value": 2}, null]));
    }

    #[test]
    fn test_expand_pattern() {
        let record = json!({"sectors": [{"pct": 1}, {"pct": 2}, {"code": 3}]});
        let found = expand_pattern(&record, &PathPattern::parse("sectors[*].pct").unwrap());
        assert_eq!(found, vec![path("sectors[0].pct"), path("sectors[1].pct")]);

        let none = expand_pattern(&record, &PathPattern::parse("locations[*].name").unwrap());
        assert!(none.is_empty());
    }

    #[test]
    fn test_merge_top_level() {
        let mut target = json!({"a": 1, "b": 2});
        assert!(merge_top_level(&mut target, &json!({"b": 3, "c": 4})));
        assert_eq!(target, json!({"a": 1, "b": 3, "c": 4}));
        assert!(!merge_top_level(&mut target, &json!([1])));
    }
}
