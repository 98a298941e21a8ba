// monitor/logger.rs - 日誌記錄模組

use std::fs;
use std::io;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::monitor::{MonitorError, MonitorResult};

/// 預設降低噪音的依賴套件
const QUIET_TARGETS: [&str; 4] = ["sqlx=warn", "hyper=warn", "html5ever=warn", "selectors=warn"];

/// 日誌系統守衛
///
/// 持有檔案寫入器的背景執行緒，必須存活到程式結束，否則尾端日誌會遺失。
#[must_use = "丟棄守衛會停止檔案日誌"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// 預設過濾指令
pub fn default_directives(level: &str) -> String {
    std::iter::once(level.to_lowercase())
        .chain(QUIET_TARGETS.iter().map(|s| s.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// 建立過濾器：`RUST_LOG` 優先於配置的級別
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)))
}

/// 初始化日誌系統
///
/// 終端輸出寫到 stderr，依 `log.format` 使用 pretty 或 JSON；stdout 保留給命令輸出。
/// 設定 `log.directory` 時另外以 JSON 寫入每日輪替的檔案。
pub fn init_logging(config: &LogConfig) -> MonitorResult<LoggingGuard> {
    let filter = build_filter(config);
    let json = config.format.eq_ignore_ascii_case("json");

    let (pretty_layer, json_layer) = if json {
        (
            None,
            Some(fmt::layer().json().with_target(true).with_writer(io::stderr)),
        )
    } else {
        (Some(fmt::layer().with_target(true).with_writer(io::stderr)), None)
    };

    let (file_layer, file_guard) = match &config.directory {
        Some(directory) => {
            fs::create_dir_all(directory).map_err(|e| {
                MonitorError::LoggerError(format!("無法建立日誌目錄 {}: {}", directory.display(), e))
            })?;
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MonitorError::InitializationError(format!("設置日誌系統失敗: {}", e)))?;

    info!(
        "日誌系統初始化完成 (level={}, format={})",
        config.level, config.format
    );
    Ok(LoggingGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives("DEBUG"),
            "debug,sqlx=warn,hyper=warn,html5ever=warn,selectors=warn"
        );
    }

    #[test]
    fn test_directives_parse() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }
}
