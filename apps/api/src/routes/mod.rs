pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::search::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/search/extract", post(handlers::handle_extract))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_remove_session),
        )
        .route(
            "/api/v1/sessions/:id/reset",
            post(handlers::handle_reset_session),
        )
        .route("/api/v1/sessions/:id/mode", put(handlers::handle_set_mode))
        .route(
            "/api/v1/sessions/:id/prompt",
            post(handlers::handle_apply_prompt),
        )
        .route(
            "/api/v1/sessions/:id/filters/:key",
            put(handlers::handle_update_filter),
        )
        .route("/api/v1/sessions/:id/search", post(handlers::handle_search))
        .route(
            "/api/v1/sessions/:id/results",
            get(handlers::handle_get_results),
        )
        .route(
            "/api/v1/sessions/:id/results/:index",
            get(handlers::handle_get_candidate),
        )
        .with_state(state)
}
