//! 儲存層
//!
//! 兩種後端實作同一個 [`CdsStorage`] 介面：
//!
//! - **csv**：單一 CSV 檔，整檔讀取、合併後寫回
//! - **postgres**：`cds_data` 表，以日期為主鍵 upsert

pub mod csv_storage;
pub mod database;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod traits;

use std::sync::Arc;

use tracing::info;

use crate::config::{ApplicationConfig, Environment};

pub use csv_storage::CsvStorage;
pub use database::{init_db_pool, CdsDatabase, DatabasePool};
pub use error::{StorageError, StorageResult};
pub use migrations::{applied_migrations, known_migrations, run_migrations, AppliedMigration, MIGRATOR};
pub use models::{CdsDataInsert, CdsDataRow};
pub use repository::{DbExecutor, PgCdsRepository};
pub use traits::{CdsStorage, StorageBackend};

/// 依配置決定儲存後端
///
/// `auto` 在設定了資料庫連線或處於 production 時使用 postgres，否則使用 csv。
pub fn resolve_backend(config: &ApplicationConfig) -> StorageResult<StorageBackend> {
    let has_url = config
        .database
        .url
        .as_deref()
        .is_some_and(|u| !u.trim().is_empty());

    let backend = match config.storage.backend.trim().to_lowercase().as_str() {
        "auto" => {
            if has_url || config.environment() == Environment::Production {
                StorageBackend::Postgres
            } else {
                StorageBackend::Csv
            }
        }
        other => other.parse()?,
    };

    if backend == StorageBackend::Postgres && !has_url {
        return Err(StorageError::Config(
            "postgres 後端需要 database.url (或 DATABASE_URL)".to_string(),
        ));
    }

    Ok(backend)
}

/// 開啟指定後端
pub async fn open_backend(
    config: &ApplicationConfig,
    backend: StorageBackend,
) -> StorageResult<Arc<dyn CdsStorage>> {
    match backend {
        StorageBackend::Csv => {
            let storage = CsvStorage::from_config(&config.storage);
            info!("使用 CSV 儲存: {}", storage.path().display());
            Ok(Arc::new(storage))
        }
        StorageBackend::Postgres => {
            let db = CdsDatabase::connect(&config.database).await?;
            if config.database.run_migrations {
                run_migrations(db.pool()).await?;
            }
            info!("使用 PostgreSQL 儲存");
            Ok(Arc::new(PgCdsRepository::new(db)))
        }
    }
}

/// 依配置解析並開啟儲存後端
pub async fn open_storage(config: &ApplicationConfig) -> StorageResult<Arc<dyn CdsStorage>> {
    let backend = resolve_backend(config)?;
    open_backend(config, backend).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn config(backend: &str, url: Option<&str>, env: Environment) -> ApplicationConfig {
        let mut config = ApplicationConfig::default();
        config.storage.backend = backend.to_string();
        config.database.url = url.map(str::to_string);
        config.app.environment = env.as_str().to_string();
        config
    }

    #[rstest]
    #[case("auto", None, Environment::Development, StorageBackend::Csv)]
    #[case("auto", Some("postgres://u@h/db"), Environment::Development, StorageBackend::Postgres)]
    #[case("csv", Some("postgres://u@h/db"), Environment::Production, StorageBackend::Csv)]
    #[case("postgres", Some("postgres://u@h/db"), Environment::Development, StorageBackend::Postgres)]
    fn test_resolve_backend(
        #[case] backend: &str,
        #[case] url: Option<&str>,
        #[case] env: Environment,
        #[case] expected: StorageBackend,
    ) {
        assert_eq!(resolve_backend(&config(backend, url, env)).unwrap(), expected);
    }

    #[test]
    fn test_postgres_without_url_fails() {
        assert_matches!(
            resolve_backend(&config("auto", None, Environment::Production)),
            Err(StorageError::Config(_))
        );
        assert_matches!(
            resolve_backend(&config("postgres", Some("  "), Environment::Development)),
            Err(StorageError::Config(_))
        );
        assert_matches!(
            resolve_backend(&config("sqlite", None, Environment::Development)),
            Err(StorageError::Config(_))
        );
    }

    #[tokio::test]
    async fn test_open_csv_storage() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config("csv", None, Environment::Development);
        config.storage.csv_path = dir.path().join("cds.csv");

        let storage = open_storage(&config).await.unwrap();

        assert_eq!(storage.backend(), StorageBackend::Csv);
        assert!(storage.load_existing().await.unwrap().is_empty());
    }
}
