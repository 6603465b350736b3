//! Capabilities a form binds to, independent of the concrete store

use async_trait::async_trait;
use contracts::shared::field_path::FieldPath;
use serde_json::Value;

use crate::error::StoreError;

/// Read and write access by path
pub trait PathAddressable {
    fn get(&self, path: &FieldPath) -> Option<&Value>;

    fn set(&mut self, path: &FieldPath, value: Value) -> Result<(), StoreError>;
}

/// Сохранение и откат изменений.
/// An empty `paths` slice means the whole record.
#[async_trait(?Send)]
pub trait Persistable {
    async fn save(&mut self, paths: &[FieldPath]) -> Result<(), StoreError>;

    fn discard(&mut self, paths: &[FieldPath]);
}
