// api.rs - API服務模組，宣告子模組
//
// 唯讀的 CDS 查詢服務：
// - 區間與最新資料查詢
// - 統計與健康檢查
// - Prometheus 指標輸出

/// 錯誤回應
pub mod error;
/// API處理器模組
pub mod handlers;
/// 服務組裝與啟動
pub mod rest;
/// API路由定義
pub mod routes;
/// 處理器共享狀態
pub mod state;

pub use error::{ApiError, ApiResult};
pub use rest::RestApi;
pub use state::AppState;
