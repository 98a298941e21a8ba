//! 資料擷取錯誤定義

use thiserror::Error;

use crate::storage::StorageError;

/// 資料擷取錯誤類型
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("HTTP 請求失敗: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP 狀態錯誤: {status} ({url})")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("所有擷取策略都找不到 CDS 表格 (已嘗試: {tried})")]
    TableNotFound { tried: String },

    #[error("無效的結構查詢 `{query}`: {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("HTTP 用戶端設定錯誤: {0}")]
    Client(String),
}

impl IngestionError {
    /// 是否為網路層錯誤（逾時、連線失敗、重試後仍非 2xx）
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }

    /// 是否為頁面結構改變造成的擷取失敗
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::TableNotFound { .. })
    }
}

/// 資料擷取結果類型
pub type IngestionResult<T> = Result<T, IngestionError>;

/// 更新流程錯誤
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl UpdateError {
    /// 命令列結束碼：網路 1、擷取 2、儲存 3
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Ingestion(e) if e.is_extraction() => 2,
            Self::Ingestion(_) => 1,
            Self::Storage(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let not_found = IngestionError::TableNotFound {
            tried: "table_scan, path_query".to_string(),
        };
        assert!(not_found.is_extraction());
        assert!(!not_found.is_network());

        let status = IngestionError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            url: "https://example.com".to_string(),
        };
        assert!(status.is_network());
        assert!(!status.is_extraction());
    }

    #[test]
    fn test_exit_codes() {
        let extraction = UpdateError::from(IngestionError::TableNotFound {
            tried: String::new(),
        });
        assert_eq!(extraction.exit_code(), 2);

        let network = UpdateError::from(IngestionError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            url: String::new(),
        });
        assert_eq!(network.exit_code(), 1);

        let storage = UpdateError::from(StorageError::Config("x".into()));
        assert_eq!(storage.exit_code(), 3);
    }
}
