//! Per-path validation failures
//!
//! Used for local rule results on the client and as the 400 response body of
//! the persistence endpoint. Server bodies come in two shapes: a flat
//! `{"sectors[0].percentage": ["..."]}` map, or nested DRF-style
//! `{"sectors": [{}, {"percentage": ["..."]}]}`. Both flatten to the same
//! paths.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::shared::field_path::FieldPath;

/// Keys that carry errors for the record as a whole
const RECORD_LEVEL_KEYS: [&str; 2] = ["non_field_errors", "detail"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<FieldPath, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: FieldPath, message: impl Into<String>) {
        self.errors.entry(path).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&[String]> {
        self.errors.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.errors.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.errors.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &[String])> {
        self.errors.iter().map(|(p, m)| (p, m.as_slice()))
    }

    /// Failures at or below any path of `scope`; an empty scope keeps everything
    pub fn within(&self, scope: &[FieldPath]) -> Self {
        if scope.is_empty() {
            return self.clone();
        }
        Self {
            errors: self
                .errors
                .iter()
                .filter(|(path, _)| scope.iter().any(|s| path.starts_with(s)))
                .map(|(p, m)| (p.clone(), m.clone()))
                .collect(),
        }
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (path, messages) in other.errors {
            self.errors.entry(path).or_default().extend(messages);
        }
    }

    /// Drop failures at or below `prefix`
    pub fn clear_under(&mut self, prefix: &FieldPath) {
        self.errors.retain(|path, _| !path.starts_with(prefix));
    }

    /// Flatten an error response body into paths
    pub fn from_response(body: &Value) -> Self {
        let mut errors = Self::new();
        flatten(&mut errors, &FieldPath::root(), body);
        errors
    }

    /// Flat `{"path": ["message", ..]}` form
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .errors
            .iter()
            .map(|(path, messages)| {
                (
                    path.to_string(),
                    Value::Array(messages.iter().cloned().map(Value::String).collect()),
                )
            })
            .collect();
        Value::Object(map)
    }
}

fn flatten(into: &mut ValidationErrors, prefix: &FieldPath, value: &Value) {
    match value {
        Value::String(message) => into.add(prefix.clone(), message.clone()),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::String(message) => into.add(prefix.clone(), message.clone()),
                    Value::Object(_) | Value::Array(_) => {
                        flatten(into, &prefix.child_index(index), item)
                    }
                    _ => {}
                }
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                let path = if RECORD_LEVEL_KEYS.contains(&key.as_str()) {
                    prefix.clone()
                } else {
                    FieldPath::parse(key)
                        .map(|parsed| prefix.join(&parsed))
                        .unwrap_or_else(|_| prefix.child_key(key.clone()))
                };
                flatten(into, &path, nested);
            }
        }
        _ => {}
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.errors.iter().map(|(p, m)| (p.to_string(), m)))
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
    fn test_flatten_nested_drf_errors() {
        let errors = ValidationErrors::from_response(&json!({
            "sectors": [{}, {"percentage": ["Ensure this value is less than or equal to 100."]}],
            "title": ["This field may not be blank."],
            "non_field_errors": ["Dates overlap"]
        }));

        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors.get(&path("sectors[1].percentage")),
            Some(&["Ensure this value is less than or equal to 100.".to_string()][..])
        );
        assert!(errors.contains(&path("title")));
        assert_eq!(
            errors.get(&FieldPath::root()),
            Some(&["Dates overlap".to_string()][..])
        );
    }

    #[test]
    fn test_flat_roundtrip() {
        let mut errors = ValidationErrors::new();
        errors.add(path("sectors[0].percentage"), "Must be a number");
        errors.add(path("sectors[0].percentage"), "Required");
        let json = errors.to_json();
        assert_eq!(
            json,
            json!({"sectors[0].percentage": ["Must be a number", "Required"]})
        );
        assert_eq!(ValidationErrors::from_response(&json), errors);
        assert_eq!(serde_json::to_value(&errors).unwrap(), json);
    }

    #[test]
    fn test_within_and_clear_under() {
        let mut errors = ValidationErrors::new();
        errors.add(path("sectors[0].code"), "Required");
        errors.add(path("title"), "Required");

        let scoped = errors.within(&[path("sectors")]);
        assert_eq!(scoped.len(), 1);
        assert!(scoped.contains(&path("sectors[0].code")));
        assert_eq!(errors.within(&[]).len(), 2);

        errors.clear_under(&path("sectors"));
        assert_eq!(errors.paths().collect::<Vec<_>>(), vec![&path("title")]);
    }
}
