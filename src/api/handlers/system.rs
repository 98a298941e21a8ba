use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;

use crate::api::AppState;

const FAVICON_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
<rect width="100" height="100" rx="20" fill="#009c3b"/>
<path d="M50 14 L88 50 L50 86 L12 50 Z" fill="#ffdf00"/>
<circle cx="50" cy="50" r="18" fill="#002776"/>
<text x="50" y="56" font-size="16" text-anchor="middle" fill="white" font-weight="bold">CDS</text>
</svg>"##;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    name: &'static str,
    version: &'static str,
    endpoints: [&'static str; 5],
}

/// GET /
pub async fn index() -> impl IntoResponse {
    Json(IndexResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ["/cds", "/cds/latest", "/cds/stats", "/health", "/metrics"],
    })
}

/// GET /health，儲存不可用時仍回傳 200 但狀態為 degraded
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.storage.health_check().await {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /favicon.ico
pub async fn favicon() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        FAVICON_SVG,
    )
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
