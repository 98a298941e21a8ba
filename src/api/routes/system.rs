// src/api/routes/system.rs
use axum::{routing::get, Router};

use crate::api::handlers::system;
use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::index))
        .route("/health", get(system::health))
        .route("/favicon.ico", get(system::favicon))
        .route("/metrics", get(system::metrics))
}
