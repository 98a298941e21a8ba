use thiserror::Error;

/// 儲存層錯誤
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("資料庫錯誤: {0}")]
    Database(#[from] sqlx::Error),

    #[error("資料庫遷移失敗: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("檔案存取錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV 讀寫錯誤: {0}")]
    Csv(#[from] csv::Error),

    #[error("儲存配置錯誤: {0}")]
    Config(String),

    #[error("無效資料: {0}")]
    InvalidData(String),

    #[error("背景工作失敗: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// 儲存層結果類型
pub type StorageResult<T> = Result<T, StorageError>;
