// src/api/rest.rs
use std::future::Future;

use axum::http::Method;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use super::{routes::api_routes, AppState};
use crate::config::ServerConfig;

pub struct RestApi {
    server_config: ServerConfig,
    state: AppState,
}

impl RestApi {
    pub fn new(server_config: ServerConfig, state: AppState) -> Self {
        Self {
            server_config,
            state,
        }
    }

    /// 綁定位址並服務，直到 `shutdown` 完成
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.server_config.bind_address()).await?;
        info!("REST API 伺服器啟動於 {}", listener.local_addr()?);

        axum::serve(listener, self.build_app())
            .with_graceful_shutdown(shutdown)
            .await
    }

    pub fn build_app(&self) -> Router {
        // 建立應用並逐層添加中間件
        let mut app = api_routes()
            .with_state(self.state.clone())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(TimeoutLayer::new(self.server_config.request_timeout()));

        if self.server_config.cors_allow_all {
            app = app.layer(self.build_cors_layer());
        }
        app
    }

    fn build_cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
            .allow_headers(Any)
            .allow_origin(Any)
    }
}
