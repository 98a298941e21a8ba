use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;
use tracing::{info, warn};

use super::error::{StorageError, StorageResult};
use crate::config::DatabaseConfig;

/// 資料庫池類型
pub type DatabasePool = PgPool;

/// 依配置建立連接池並測試連線
pub async fn init_db_pool(config: &DatabaseConfig) -> StorageResult<PgPool> {
    let url = config
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| StorageError::Config("未設定 database.url".to_string()))?;

    let options = PgConnectOptions::from_str(url)?.disable_statement_logging();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime())
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .connect_with(options)
        .await?;

    // 測試連接
    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("資料庫連接成功: {}", config.redacted_url().unwrap_or_default());
    Ok(pool)
}

/// 資料庫包裝器
#[derive(Debug, Clone)]
pub struct CdsDatabase {
    pool: PgPool,
}

impl CdsDatabase {
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        Ok(Self::from_pool(init_db_pool(config).await?))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 獲取連接池
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 健康檢查
    pub async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!("資料庫健康檢查失敗: {}", e);
                false
            }
        }
    }

    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("資料庫連接池已關閉");
        }
    }
}
