// src/api/routes/cds.rs
use axum::{routing::get, Router};

use crate::api::handlers::cds;
use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cds", get(cds::get_cds))
        .route("/cds/", get(cds::get_cds))
        .route("/cds/latest", get(cds::get_latest))
        .route("/cds/stats", get(cds::get_stats))
}
