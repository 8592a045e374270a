pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::candidates::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/candidates",
            get(handlers::handle_list).post(handlers::handle_create),
        )
        .route(
            "/api/candidates/:id",
            get(handlers::handle_get)
                .put(handlers::handle_update)
                .delete(handlers::handle_delete),
        )
        .route("/api/stats", get(handlers::handle_stats))
        .route("/api/import/csv", post(handlers::handle_import_csv))
        .route("/api/import/json", post(handlers::handle_import_json))
        .with_state(state)
}
