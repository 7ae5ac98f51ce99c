mod handlers;
pub mod models;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

/// Build the complete API router.
pub fn router(config: Arc<Config>) -> Router {
    let body_limit = config.body_limit();
    let state = AppState { config };

    Router::new()
        .route("/execute", post(handlers::execute))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
