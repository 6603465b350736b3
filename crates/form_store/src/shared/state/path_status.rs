use std::collections::BTreeSet;

use contracts::shared::field_path::{FieldPath, PathToken};
use contracts::shared::metadata::ValidationErrors;
use serde::Serialize;

/// Состояние пути для отображения в форме
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    /// The path or one of its ancestors failed validation
    Validation,
    /// Marked for deletion on the next save
    Delete,
    /// Added locally, not yet saved
    Create,
    /// Edited since the last load or save
    Update,
    Unchanged,
}

/// Local edit bookkeeping: which paths were set, created or marked deleted
#[derive(Debug, Clone, Default)]
pub struct PathQueues {
    updated: BTreeSet<FieldPath>,
    created: BTreeSet<FieldPath>,
    deleted: BTreeSet<FieldPath>,
}

impl PathQueues {
    pub fn mark_updated(&mut self, path: FieldPath) {
        self.updated.insert(path);
    }

    pub fn mark_created(&mut self, path: FieldPath) {
        self.created.insert(path);
    }

    /// Flip the delete mark; returns true when the path is now marked
    pub fn toggle_deleted(&mut self, path: &FieldPath) -> bool {
        if self.deleted.remove(path) {
            false
        } else {
            self.deleted.insert(path.clone());
            true
        }
    }

    pub fn is_deleted(&self, path: &FieldPath) -> bool {
        self.deleted.contains(path)
    }

    pub fn deleted(&self) -> impl Iterator<Item = &FieldPath> {
        self.deleted.iter()
    }

    /// Delete marks at or below any path of `scope`
    pub fn deleted_within(&self, scope: &[FieldPath]) -> Vec<FieldPath> {
        self.deleted
            .iter()
            .filter(|path| scope.iter().any(|s| path.starts_with(s)))
            .cloned()
            .collect()
    }

    pub fn updated(&self) -> impl Iterator<Item = &FieldPath> {
        self.updated.iter()
    }

    pub fn clear(&mut self) {
        self.updated.clear();
        self.created.clear();
        self.deleted.clear();
    }

    pub fn clear_under(&mut self, prefix: &FieldPath) {
        for set in [&mut self.updated, &mut self.created, &mut self.deleted] {
            set.retain(|path| !path.starts_with(prefix));
        }
    }

    /// Keep marks aligned after `array[removed]` is taken out of the record
    pub fn shift_after_removal(&mut self, array: &FieldPath, removed: usize) {
        for set in [&mut self.updated, &mut self.created, &mut self.deleted] {
            *set = std::mem::take(set)
                .into_iter()
                .filter_map(|path| reindex(path, array, removed))
                .collect();
        }
    }

    pub fn status(&self, path: &FieldPath, failed: &ValidationErrors) -> PathStatus {
        if failed.contains(&FieldPath::root()) || path.ancestors().any(|p| failed.contains(&p)) {
            return PathStatus::Validation;
        }
        for (set, status) in [
            (&self.deleted, PathStatus::Delete),
            (&self.created, PathStatus::Create),
            (&self.updated, PathStatus::Update),
        ] {
            if path.ancestors().any(|p| set.contains(&p)) {
                return status;
            }
        }
        PathStatus::Unchanged
    }
}

fn reindex(path: FieldPath, array: &FieldPath, removed: usize) -> Option<FieldPath> {
    if !path.starts_with(array) || path.len() == array.len() {
        return Some(path);
    }
    match path.tokens()[array.len()].as_index() {
        Some(i) if i == removed => None,
        Some(i) if i > removed => {
            let mut tokens = path.tokens().to_vec();
            tokens[array.len()] = PathToken::Index(i - 1);
            Some(FieldPath::from_tokens(tokens))
        }
        _ => Some(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_status_priority() {
        let mut queues = PathQueues::default();
        queues.mark_updated(path("sectors"));
        queues.mark_created(path("sectors[1]"));
        queues.toggle_deleted(&path("sectors[1]"));

        let mut failed = ValidationErrors::new();
        assert_eq!(queues.status(&path("sectors[1].pct"), &failed), PathStatus::Delete);
        assert_eq!(queues.status(&path("sectors[0].pct"), &failed), PathStatus::Update);
        assert_eq!(queues.status(&path("title"), &failed), PathStatus::Unchanged);

        failed.add(path("sectors[1]"), "Required");
        assert_eq!(queues.status(&path("sectors[1].pct"), &failed), PathStatus::Validation);
    }

    #[test]
    fn test_toggle_deleted() {
        let mut queues = PathQueues::default();
        assert!(queues.toggle_deleted(&path("sectors[0]")));
        assert!(queues.is_deleted(&path("sectors[0]")));
        assert!(!queues.toggle_deleted(&path("sectors[0]")));
        assert!(!queues.is_deleted(&path("sectors[0]")));
    }

    #[test]
    fn test_shift_after_removal() {
        let mut queues = PathQueues::default();
        queues.mark_updated(path("sectors[0].pct"));
        queues.mark_updated(path("sectors[1].pct"));
        queues.mark_created(path("sectors[2]"));
        queues.mark_updated(path("title"));

        queues.shift_after_removal(&path("sectors"), 1);

        let updated: Vec<String> = queues.updated().map(ToString::to_string).collect();
        assert_eq!(updated, vec!["sectors[0].pct", "title"]);
        assert_eq!(queues.status(&path("sectors[1]"), &ValidationErrors::new()), PathStatus::Create);
    }
}
