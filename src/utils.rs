// utils.rs - 公共工具模組
//
// 提供各種通用的工具函數和輔助方法，用於簡化系統其他部分的代碼。

pub mod time_utils;

// 重新導出時間工具函數，使其可以通過 utils::function_name 直接訪問
pub use time_utils::{
    // 日期解析
    parse_day_first_date,
    parse_iso_date,
    parse_opt_iso_date,
    // 時間戳
    backup_timestamp,
    current_backup_timestamp,
    ISO_DATE_FORMAT,
};
