use anyhow::{Context, Result};
use brazil_cds::api::{AppState, RestApi};
use brazil_cds::config::ApplicationConfig;
use brazil_cds::monitor::{init_logging, install_prometheus_recorder};
use brazil_cds::storage;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化配置
    let app_config = ApplicationConfig::load_from_env().context("無法載入配置")?;

    // 初始化日誌系統，守衛需存活到程式結束
    let _log_guard = init_logging(&app_config.log)?;
    info!(
        "啟動 {} v{} ({})",
        app_config.app.name,
        env!("CARGO_PKG_VERSION"),
        app_config.app.environment
    );

    let metrics = if app_config.server.metrics_enabled {
        match install_prometheus_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("{}，停用 /metrics", e);
                None
            }
        }
    } else {
        None
    };

    // 開啟儲存後端（postgres 時依配置執行遷移）
    let storage = storage::open_storage(&app_config)
        .await
        .context("無法開啟儲存後端")?;

    let mut state = AppState::new(storage.clone());
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let result = RestApi::new(app_config.server.clone(), state)
        .serve(shutdown_signal())
        .await;

    storage.close().await;

    match result {
        Ok(()) => {
            info!("伺服器已關閉");
            Ok(())
        }
        Err(e) => {
            error!("伺服器錯誤: {}", e);
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("接收到關閉信號，正在退出..."),
        Err(err) => error!("無法監聽關閉信號: {}", err),
    }
}
