// time_utils.rs
//
// 提供日期解析與格式化相關的工具函數。
// 主要功能：
// 1. 解析抓取頁面中的日期（日在前）
// 2. 解析 API 查詢參數與 CSV 中的 ISO 日期
// 3. 產生備份檔案使用的時間戳

use chrono::{DateTime, Local, NaiveDate, TimeZone};

/// ISO 日期格式（CSV 與 API 共用）
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// 備份檔案名稱使用的時間戳格式
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// 日在前的格式優先嘗試，ISO 與英文月份格式作為後備。
// 兩位數年份必須排在前面：%Y 也會接受 "25" 並解析成西元 25 年。
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d.%m.%y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%b %d, %Y",
    "%d %b %Y",
];

//
// 日期解析
//

/// 以「日在前」慣例解析日期字串
///
/// 支援 `07.11.2025`、`07/11/2025`、`07-11-2025`，以及 ISO 格式與
/// `Nov 07, 2025` 這類英文版頁面的格式。無法解析時回傳 `None`。
pub fn parse_day_first_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    DAY_FIRST_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// 解析 `YYYY-MM-DD` 格式的日期
pub fn parse_iso_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), ISO_DATE_FORMAT)
}

/// 解析可選的 ISO 日期參數，空字串視為未提供
pub fn parse_opt_iso_date(s: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_iso_date(value).map(Some),
    }
}

//
// 時間戳
//

/// 產生備份檔案名稱使用的本地時間戳
pub fn backup_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(BACKUP_TIMESTAMP_FORMAT).to_string()
}

/// 目前本地時間的備份時間戳
pub fn current_backup_timestamp() -> String {
    backup_timestamp(&Local::now())
}
