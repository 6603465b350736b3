use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::domain::a001_activity::aggregate::ID_KEY;
use serde_json::{json, Value};
use tokio::sync::RwLock;

#[derive(Default)]
struct Storage {
    last_id: i64,
    records: BTreeMap<i64, Value>,
}

/// Хранилище активностей в памяти
#[derive(Clone, Default)]
pub struct ActivityRepository {
    storage: Arc<RwLock<Storage>>,
}

impl ActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Все записи по возрастанию ID
    pub async fn list_all(&self) -> Vec<Value> {
        let storage = self.storage.read().await;
        storage.records.values().cloned().collect()
    }

    pub async fn get_by_id(&self, id: i64) -> Option<Value> {
        let storage = self.storage.read().await;
        storage.records.get(&id).cloned()
    }

    /// Вставка с выдачей нового ID; возвращает сохранённую запись
    pub async fn insert(&self, mut record: Value) -> Value {
        let mut storage = self.storage.write().await;
        storage.last_id += 1;
        let id = storage.last_id;
        if let Value::Object(map) = &mut record {
            map.insert(ID_KEY.to_string(), json!(id));
        }
        storage.records.insert(id, record.clone());
        record
    }

    /// Returns false when `id` is unknown
    pub async fn update(&self, id: i64, record: Value) -> bool {
        let mut storage = self.storage.write().await;
        match storage.records.get_mut(&id) {
            Some(existing) => {
                *existing = record;
                true
            }
            None => false,
        }
    }

    pub async fn delete(&self, id: i64) -> bool {
        let mut storage = self.storage.write().await;
        storage.records.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = ActivityRepository::new();
        let first = repo.insert(json!({"description": "a"})).await;
        let second = repo.insert(json!({"description": "b"})).await;
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));
        assert_eq!(repo.list_all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown() {
        let repo = ActivityRepository::new();
        assert!(!repo.update(5, json!({})).await);
        assert!(!repo.delete(5).await);

        let stored = repo.insert(json!({})).await;
        assert!(repo.update(1, json!({"id": 1, "description": "x"})).await);
        assert_eq!(repo.get_by_id(1).await.unwrap()["description"], json!("x"));
        assert_eq!(stored["id"], json!(1));
        assert!(repo.delete(1).await);
        assert!(repo.get_by_id(1).await.is_none());
    }
}
