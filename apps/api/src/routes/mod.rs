pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::export::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Export API
        .route("/api/v1/export", post(handlers::handle_export))
        .route(
            "/api/v1/export/status",
            get(handlers::handle_export_status),
        )
        .route("/api/v1/export/plan", post(handlers::handle_plan))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}
