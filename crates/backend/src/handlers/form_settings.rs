use axum::{extract::Path, Json};
use contracts::domain::a001_activity::aggregate;
use contracts::shared::form_settings::FormSettings;

/// GET /api/form_settings/:form_key
///
/// Разделы формы и исключения сравнения; `null` для неизвестной формы.
pub async fn get_settings(Path(form_key): Path<String>) -> Json<Option<FormSettings>> {
    let settings = match form_key.as_str() {
        aggregate::COLLECTION_NAME => Some(aggregate::form_settings()),
        _ => {
            tracing::warn!("Unknown form key requested: {}", form_key);
            None
        }
    };
    Json(settings)
}
