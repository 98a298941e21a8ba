//! 資料擷取模組
//!
//! 負責從來源網頁取得 CDS 歷史資料並轉換成標準記錄：
//!
//! - **fetcher**：帶重試與退避的 HTTP 下載
//! - **extractor**：依序嘗試多種表格擷取策略
//! - **normalizer**：將各種欄位名稱對應到標準欄位
//! - **number**：巴西格式數字與百分比解析
//! - **updater**：下載 → 擷取 → 寫入儲存的完整流程
//! - **validator**：匯入 CSV 前的資料檢查

pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod normalizer;
pub mod number;
pub mod updater;
pub mod validator;

pub use error::{IngestionError, IngestionResult, UpdateError};
pub use extractor::{Extraction, Extractor, TableStrategy};
pub use fetcher::{Fetcher, RetryPolicy};
pub use normalizer::{normalize_table, CanonicalField, RawTable};
pub use number::{clean_number, parse_change_pct};
pub use updater::{CdsUpdater, UpdateReport};
pub use validator::{validate_csv, ValidationReport};
