use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use contracts::shared::choices::ChoiceSet;
use serde_json::Value;

use crate::domain::a001_activity::service::{self, ServiceError};
use crate::shared::app_state::AppState;

type ErrorResponse = (StatusCode, Json<Value>);

fn error_response(e: ServiceError) -> ErrorResponse {
    let status = match &e {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) | ServiceError::NotAnObject => StatusCode::BAD_REQUEST,
    };
    if status == StatusCode::BAD_REQUEST {
        tracing::warn!("activity write rejected: {}", e);
    }
    (status, Json(e.to_json()))
}

fn parse_id(id: &str) -> Result<i64, StatusCode> {
    id.parse::<i64>().map_err(|_| StatusCode::BAD_REQUEST)
}

/// GET /api/activity
pub async fn list_all(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(service::list_all(&state.activities).await)
}

/// GET /api/activity/:id
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ErrorResponse> {
    let id = parse_id(&id).map_err(|s| (s, Json(Value::Null)))?;
    service::get_by_id(&state.activities, id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /api/activity
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ErrorResponse> {
    service::create(&state.activities, body)
        .await
        .map(|stored| (StatusCode::CREATED, Json(stored)))
        .map_err(error_response)
}

/// PUT /api/activity/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ErrorResponse> {
    let id = parse_id(&id).map_err(|s| (s, Json(Value::Null)))?;
    service::update(&state.activities, id, body)
        .await
        .map(Json)
        .map_err(error_response)
}

/// DELETE /api/activity/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let id = parse_id(&id)?;
    match service::delete(&state.activities, id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /api/activity/choices
pub async fn choices() -> Json<ChoiceSet> {
    Json(service::choices())
}

/// POST /api/activity/testdata
pub async fn insert_test_data(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ErrorResponse> {
    service::insert_test_data(&state.activities)
        .await
        .map(|stored| (StatusCode::CREATED, Json(stored)))
        .map_err(error_response)
}
