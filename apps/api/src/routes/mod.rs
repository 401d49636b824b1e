pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::insights::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/data", get(health::data_handler))
        .route("/api/send-text", post(handlers::handle_send_text))
        .route(
            "/ask-question",
            get(handlers::handle_ask_question_query).post(handlers::handle_ask_question),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
