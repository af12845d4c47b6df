pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::returns::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/returns/process",
            post(handlers::handle_process_return),
        )
        .with_state(state)
}
