use std::sync::Arc;

use contracts::shared::field_path::FieldPath;
use contracts::shared::json_tree::{self, AssignError};
use serde_json::Value;

/// Last-known server state of the record.
///
/// Snapshots are immutable; every update builds a new one, so a clone handed
/// out earlier keeps describing the state it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Arc<Value>);

impl Snapshot {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// Deep copy of `value`
    pub fn of(value: &Value) -> Self {
        Self::new(value.clone())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        json_tree::get(&self.0, path)
    }

    /// New snapshot where every path of `paths` holds what `source` holds
    pub fn with_paths_from(&self, source: &Value, paths: &[FieldPath]) -> Result<Self, AssignError> {
        let mut next = (*self.0).clone();
        for path in paths {
            sync_path(&mut next, source, path)?;
        }
        Ok(Self::new(next))
    }
}

/// Make `target` agree with `source` at `path`.
///
/// A path missing from `source` is removed from `target`. When `target` lacks
/// an ancestor of the path, the shortest missing ancestor is copied whole;
/// when that ancestor cannot be placed (an array index past the end), its
/// parent is copied instead.
pub fn sync_path(target: &mut Value, source: &Value, path: &FieldPath) -> Result<(), AssignError> {
    if path.is_root() {
        *target = source.clone();
        return Ok(());
    }
    if !json_tree::contains(source, path) {
        json_tree::remove(target, path);
        return Ok(());
    }

    let prefix = path
        .ancestors()
        .find(|prefix| prefix == path || !json_tree::contains(target, prefix))
        .unwrap_or_else(|| path.clone());
    let value = json_tree::get(source, &prefix).cloned().unwrap_or(Value::Null);

    match json_tree::assign(target, &prefix, value) {
        Ok(_) => Ok(()),
        Err(AssignError::IndexOutOfBounds { .. }) => {
            let parent = prefix.parent().unwrap_or_default();
            let value = json_tree::get(source, &parent).cloned().unwrap_or(Value::Null);
            json_tree::assign(target, &parent, value).map(|_| ())
        }
        Err(e) => Err(e),
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
    fn test_sync_replaces_leaf() {
        let mut target = json!({"title": "a", "sectors": []});
        sync_path(&mut target, &json!({"title": "b"}), &path("title")).unwrap();
        assert_eq!(target, json!({"title": "b", "sectors": []}));
    }

    #[test]
    fn test_sync_removes_missing() {
        let mut target = json!({"sectors": [{"code": 1}, {"code": 2}]});
        let source = json!({"sectors": [{"code": 1}]});
        sync_path(&mut target, &source, &path("sectors[1]")).unwrap();
        assert_eq!(target, json!({"sectors": [{"code": 1}]}));
    }

    #[test]
    fn test_sync_copies_missing_ancestor() {
        let mut target = json!({"id": 3});
        let source = json!({"locations": [{"name": "Kisumu"}]});
        sync_path(&mut target, &source, &path("locations[0].name")).unwrap();
        assert_eq!(target, json!({"id": 3, "locations": [{"name": "Kisumu"}]}));
    }

    #[test]
    fn test_sync_index_past_end_copies_array() {
        let mut target = json!({"sectors": []});
        let source = json!({"sectors": [{"code": 1}, {"code": 2}]});
        sync_path(&mut target, &source, &path("sectors[1].code")).unwrap();
        assert_eq!(target, source);
    }

    #[test]
    fn test_snapshot_update_leaves_original() {
        let before = Snapshot::new(json!({"title": "a", "status": "2"}));
        let after = before
            .with_paths_from(&json!({"title": "b", "status": "3"}), &[path("title")])
            .unwrap();
        assert_eq!(before.get(&path("title")), Some(&json!("a")));
        assert_eq!(after.value(), &json!({"title": "b", "status": "2"}));
    }
}
