use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 標準欄位順序，CSV 標頭與 API 輸出共用
pub const CANONICAL_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "change_pct"];

/// 單日 CDS 記錄
///
/// `date` 為唯一鍵；`close` 是唯一必填的價格欄位，其餘可能缺失。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdsRecord {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub change_pct: Option<f64>,
}

impl CdsRecord {
    /// 建立只有收盤價的記錄
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            change_pct: None,
        }
    }

    /// 設定開高低價
    pub fn with_ohlc(mut self, open: Option<f64>, high: Option<f64>, low: Option<f64>) -> Self {
        self.open = open;
        self.high = high;
        self.low = low;
        self
    }

    /// 設定漲跌幅（百分比數值，例如 1.38 代表 +1.38%）
    pub fn with_change_pct(mut self, change_pct: Option<f64>) -> Self {
        self.change_pct = change_pct;
        self
    }
}

/// 依日期升冪排序（穩定排序，同日記錄保持原順序）
pub fn sort_by_date(records: &mut [CdsRecord]) {
    records.sort_by_key(|r| r.date);
}

/// 合併新舊批次並去重
///
/// 依 `old` 再 `new` 的順序串接，每個日期只保留最後一次出現的記錄，
/// 因此兩邊都有的日期以新資料為準。結果依日期升冪排列。
pub fn merge_and_dedup<I, J>(old: I, new: J) -> Vec<CdsRecord>
where
    I: IntoIterator<Item = CdsRecord>,
    J: IntoIterator<Item = CdsRecord>,
{
    let mut by_date: BTreeMap<NaiveDate, CdsRecord> = BTreeMap::new();
    for record in old.into_iter().chain(new) {
        by_date.insert(record.date, record);
    }
    by_date.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_merge_new_wins_and_sorted() {
        let old = vec![CdsRecord::new(day(1), 1.0)];
        let new = vec![CdsRecord::new(day(1), 2.0), CdsRecord::new(day(2), 3.0)];

        let merged = merge_and_dedup(old, new);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].date, day(1));
        assert_eq!(merged[0].close, 2.0);
        assert_eq!(merged[1].date, day(2));
        assert_eq!(merged[1].close, 3.0);
    }

    #[test]
    fn test_merge_duplicates_inside_new_batch_keep_last() {
        let new = vec![
            CdsRecord::new(day(3), 1.0),
            CdsRecord::new(day(1), 5.0),
            CdsRecord::new(day(3), 9.0),
        ];

        let merged = merge_and_dedup(Vec::new(), new);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].date, day(1));
        assert_eq!(merged[1].close, 9.0);
    }

    #[test]
    fn test_merge_replaces_whole_record() {
        let old = vec![CdsRecord::new(day(1), 1.0).with_ohlc(Some(1.0), Some(1.1), Some(0.9))];
        let new = vec![CdsRecord::new(day(1), 2.0)];

        let merged = merge_and_dedup(old, new);

        // 新記錄整筆覆蓋，不保留舊的開高低
        assert_eq!(merged, vec![CdsRecord::new(day(1), 2.0)]);
    }

    #[test]
    fn test_sort_by_date_is_stable() {
        let mut records = vec![
            CdsRecord::new(day(2), 1.0),
            CdsRecord::new(day(1), 2.0),
            CdsRecord::new(day(2), 3.0),
        ];
        sort_by_date(&mut records);
        let closes: Vec<f64> = records.iter().map(|r| r.close).collect();
        assert_eq!(closes, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_json_shape() {
        let record = CdsRecord::new(day(7), 0.0145).with_change_pct(Some(1.38));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2025-01-07");
        assert_eq!(json["open"], serde_json::Value::Null);
        assert_eq!(json["close"], 0.0145);
        assert_eq!(json["change_pct"], 1.38);
    }
}
