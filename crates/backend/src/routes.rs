use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::shared::app_state::AppState;
use crate::shared::logger::request_logger;

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // Activity handlers
        .route(
            "/api/activity",
            get(handlers::a001_activity::list_all).post(handlers::a001_activity::create),
        )
        .route(
            "/api/activity/choices",
            get(handlers::a001_activity::choices),
        )
        .route(
            "/api/activity/testdata",
            post(handlers::a001_activity::insert_test_data),
        )
        .route(
            "/api/activity/:id",
            get(handlers::a001_activity::get_by_id)
                .put(handlers::a001_activity::update)
                .delete(handlers::a001_activity::delete),
        )
        // Form settings
        .route(
            "/api/form_settings/:form_key",
            get(handlers::form_settings::get_settings),
        )
        .layer(middleware::from_fn(request_logger))
        .with_state(state)
}
