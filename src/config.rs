/// 配置管理模組
///
/// 本模組負責加載、驗證配置。配置來源依優先級由低到高：
/// 內建預設值、`config/<env>.toml`、`CDS__` 前綴的環境變數。
// 宣告子模組
pub mod loader;
pub mod manager;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigLoader, Environment};
pub use manager::ConfigLoadError;
pub use types::*;
pub use validation::{ValidationError, ValidationUtils, Validator};

