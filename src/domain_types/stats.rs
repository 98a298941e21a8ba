use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cds_record::CdsRecord;

/// 資料集彙總統計
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CdsStats {
    pub total_records: u64,
    pub oldest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub latest_close: Option<f64>,
}

impl CdsStats {
    /// 空資料集的統計
    pub fn empty() -> Self {
        Self::default()
    }

    /// 從已升冪排序的記錄計算統計
    pub fn from_records(records: &[CdsRecord]) -> Self {
        match (records.first(), records.last()) {
            (Some(first), Some(last)) => Self {
                total_records: records.len() as u64,
                oldest_date: Some(first.date),
                latest_date: Some(last.date),
                latest_close: Some(last.close),
            },
            _ => Self::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = CdsStats::from_records(&[]);
        assert_eq!(stats.total_records, 0);
        assert!(stats.oldest_date.is_none());
        assert!(stats.latest_date.is_none());
        assert!(stats.latest_close.is_none());
        assert!(stats.is_empty());

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_records"], 0);
        assert!(json["latest_close"].is_null());
    }

    #[test]
    fn test_stats_from_series() {
        let d1 = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let stats = CdsStats::from_records(&[CdsRecord::new(d1, 1.5), CdsRecord::new(d2, 1.7)]);

        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.oldest_date, Some(d1));
        assert_eq!(stats.latest_date, Some(d2));
        assert_eq!(stats.latest_close, Some(1.7));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["latest_date"], "2025-01-02");
    }
}
