//! 巴西格式數字解析
//!
//! 來源頁面使用 pt-BR 格式：`.` 為千分位、`,` 為小數點，數值通常帶 `%`。

use once_cell::sync::Lazy;
use regex::Regex;

/// 視為缺值的字串（比對前先轉小寫）
const NULL_SENTINELS: [&str; 4] = ["nan", "none", "null", "-"];

static SIGNED_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([+-]?[0-9]+(?:\.[0-9]+)?)").expect("valid decimal regex"));

/// 將 Unicode 減號統一為 ASCII
fn normalize_minus(s: &str) -> String {
    s.replace('\u{2212}', "-")
}

/// 解析 OHLC 數值
///
/// 移除所有 `.`（一律視為千分位）、`,` 轉為 `.`、移除 `%`，再除以 100。
/// 空字串、缺值標記或無法解析時回傳 `None`。
///
/// 注意 `"1.234"` 會被解析為 `12.34`：帶小數點的英文格式無法與千分位區分。
pub fn clean_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || NULL_SENTINELS.contains(&s.to_lowercase().as_str()) {
        return None;
    }

    let cleaned = normalize_minus(s)
        .replace('.', "")
        .replace(',', ".")
        .replace('%', "");

    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v / 100.0)
}

/// 解析漲跌幅百分比，保留正負號
///
/// `"+1,56%"` 解析為 `1.56`。直接解析失敗時，取字串中第一個帶號小數作為後備。
pub fn parse_change_pct(s: &str) -> Option<f64> {
    let cleaned = normalize_minus(s.trim())
        .replace(' ', "")
        .replace('%', "")
        .replace(',', ".");

    if let Some(v) = cleaned.parse::<f64>().ok().filter(|v| v.is_finite()) {
        return Some(v);
    }

    SIGNED_DECIMAL
        .captures(&cleaned)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}
