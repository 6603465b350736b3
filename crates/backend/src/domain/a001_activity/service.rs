use chrono::Utc;
use contracts::domain::a001_activity::aggregate::{self, ID_KEY, MODIFIED_KEY};
use contracts::shared::choices::ChoiceSet;
use contracts::shared::metadata::ValidationErrors;
use serde_json::{json, Value};
use thiserror::Error;

use super::repository::ActivityRepository;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Activity {0} not found")]
    NotFound(i64),

    #[error("Validation failed for {} path(s)", .0.len())]
    Validation(ValidationErrors),

    #[error("Request body must be a JSON object")]
    NotAnObject,
}

impl ServiceError {
    /// Тело ответа 400 в плоском формате `{"path": ["message"]}`
    pub fn to_json(&self) -> Value {
        match self {
            Self::Validation(errors) => errors.to_json(),
            other => json!({ "non_field_errors": [other.to_string()] }),
        }
    }
}

/// Merge a partial payload into a stored record.
///
/// Objects merge key by key. Arrays merge by position: `null` keeps the
/// stored element, objects merge into it, anything else replaces it. The
/// result has the patch's length, so rows left out of a whole-array save are
/// dropped.
pub fn merge_partial(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_partial(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(patch)) => {
            let len = patch.len();
            for (index, value) in patch.into_iter().enumerate() {
                match target.get_mut(index) {
                    Some(_) if value.is_null() => {}
                    Some(existing) => merge_partial(existing, value),
                    None => target.push(value),
                }
            }
            target.truncate(len);
        }
        (target, patch) => *target = patch,
    }
}

fn validate(record: &Value) -> Result<(), ServiceError> {
    let errors = aggregate::rule_set().validate(record);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::Validation(errors))
    }
}

fn stamp_modified(record: &mut Value) {
    if let Value::Object(map) = record {
        map.insert(MODIFIED_KEY.to_string(), json!(Utc::now().to_rfc3339()));
    }
}

/// Создание новой активности
pub async fn create(repo: &ActivityRepository, mut body: Value) -> Result<Value, ServiceError> {
    let Value::Object(map) = &mut body else {
        return Err(ServiceError::NotAnObject);
    };
    map.remove(ID_KEY);

    // Валидация
    validate(&body)?;

    stamp_modified(&mut body);
    let stored = repo.insert(body).await;
    tracing::info!(id = %stored[ID_KEY], "activity created");
    Ok(stored)
}

/// Обновление существующей активности частичным payload
pub async fn update(repo: &ActivityRepository, id: i64, body: Value) -> Result<Value, ServiceError> {
    if !body.is_object() {
        return Err(ServiceError::NotAnObject);
    }
    let mut record = repo
        .get_by_id(id)
        .await
        .ok_or(ServiceError::NotFound(id))?;

    merge_partial(&mut record, body);
    if let Value::Object(map) = &mut record {
        map.insert(ID_KEY.to_string(), json!(id));
    }

    // Валидация
    validate(&record)?;

    stamp_modified(&mut record);
    if !repo.update(id, record.clone()).await {
        return Err(ServiceError::NotFound(id));
    }
    tracing::info!(id, "activity updated");
    Ok(record)
}

pub async fn delete(repo: &ActivityRepository, id: i64) -> Result<(), ServiceError> {
    if repo.delete(id).await {
        tracing::info!(id, "activity deleted");
        Ok(())
    } else {
        Err(ServiceError::NotFound(id))
    }
}

pub async fn get_by_id(repo: &ActivityRepository, id: i64) -> Result<Value, ServiceError> {
    repo.get_by_id(id).await.ok_or(ServiceError::NotFound(id))
}

pub async fn list_all(repo: &ActivityRepository) -> Vec<Value> {
    repo.list_all().await
}

pub fn choices() -> ChoiceSet {
    aggregate::choices()
}

/// Вставка тестовых данных
pub async fn insert_test_data(repo: &ActivityRepository) -> Result<Value, ServiceError> {
    create(repo, aggregate::sample()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::shared::field_path::FieldPath;

    #[test]
    fn test_merge_partial_positional() {
        let mut record = json!({
            "id": 1,
            "sectors": [{"code": "1", "percentage": 40}, {"code": "2", "percentage": 60}, {"code": "3"}]
        });
        merge_partial(
            &mut record,
            json!({"id": 1, "sectors": [null, {"percentage": 50}, null]}),
        );
        assert_eq!(
            record["sectors"],
            json!([{"code": "1", "percentage": 40}, {"code": "2", "percentage": 50}, {"code": "3"}])
        );
    }

    #[test]
    fn test_merge_partial_drops_omitted_rows() {
        let mut record = json!({"sectors": [{"code": "1"}, {"code": "2"}], "description": "a"});
        merge_partial(&mut record, json!({"sectors": [{"code": "2"}]}));
        assert_eq!(record, json!({"sectors": [{"code": "2"}], "description": "a"}));
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_stamps() {
        let repo = ActivityRepository::new();
        let mut body = aggregate::sample();
        body["id"] = json!(99);
        let stored = create(&repo, body).await.unwrap();
        assert_eq!(stored["id"], json!(1));
        assert!(stored[MODIFIED_KEY].is_string());
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_merge() {
        let repo = ActivityRepository::new();
        insert_test_data(&repo).await.unwrap();

        let err = update(&repo, 1, json!({"sectors": [null, {"percentage": 10}]}))
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.contains(&FieldPath::key("sectors")));
        assert_eq!(
            err.to_json()["sectors"],
            json!(["Values should add up to 100."])
        );

        // stored record is untouched
        let stored = get_by_id(&repo, 1).await.unwrap();
        assert_eq!(stored["sectors"][1]["percentage"], json!(30));
    }

    #[tokio::test]
    async fn test_update_unknown_and_non_object() {
        let repo = ActivityRepository::new();
        assert!(matches!(
            update(&repo, 3, json!({})).await,
            Err(ServiceError::NotFound(3))
        ));
        assert!(matches!(
            create(&repo, json!([1, 2])).await,
            Err(ServiceError::NotAnObject)
        ));
        assert_eq!(
            ServiceError::NotAnObject.to_json(),
            json!({"non_field_errors": ["Request body must be a JSON object"]})
        );
    }
}
