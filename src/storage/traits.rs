use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use super::error::{StorageError, StorageResult};
use crate::config::POSTGRES_BACKEND_ALIASES;
use crate::domain_types::{CdsRecord, CdsStats, RangeQuery};

/// 儲存後端種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Csv,
    Postgres,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Csv => "csv",
            StorageBackend::Postgres => "postgres",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(StorageBackend::Csv),
            alias if POSTGRES_BACKEND_ALIASES.contains(&alias) => Ok(StorageBackend::Postgres),
            other => Err(StorageError::Config(format!("未知的儲存後端: {other}"))),
        }
    }
}

/// CDS 序列儲存介面
///
/// 所有讀取結果依日期升冪排列，且每個日期至多一筆。
#[async_trait]
pub trait CdsStorage: Send + Sync {
    fn backend(&self) -> StorageBackend;

    /// 讀取全部既有記錄，沒有資料時回傳空集合
    async fn load_existing(&self) -> StorageResult<Vec<CdsRecord>>;

    /// 合併或 upsert 一批記錄，回傳批次去重後寫入的筆數
    async fn store_batch(&self, batch: &[CdsRecord]) -> StorageResult<usize>;

    /// 日期區間查詢；有筆數限制時回傳區間內最新的幾筆
    async fn get(&self, query: RangeQuery) -> StorageResult<Vec<CdsRecord>>;

    /// 最新 `n` 筆
    async fn get_latest(&self, n: usize) -> StorageResult<Vec<CdsRecord>> {
        self.get(RangeQuery::latest(n)).await
    }

    async fn get_stats(&self) -> StorageResult<CdsStats>;

    async fn health_check(&self) -> bool {
        true
    }

    /// 釋放資源
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("csv".parse::<StorageBackend>().unwrap(), StorageBackend::Csv);
        assert_eq!(" Postgres ".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!("pg".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_matches!("sqlite".parse::<StorageBackend>(), Err(StorageError::Config(_)));
        assert_eq!(StorageBackend::Postgres.to_string(), "postgres");
    }
}
