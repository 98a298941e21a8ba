use chrono::NaiveDate;

use super::cds_record::CdsRecord;

/// 日期區間查詢（兩端皆包含）
///
/// 指定 `limit` 時回傳區間內最新的 `limit` 筆，仍以日期升冪呈現。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl RangeQuery {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>, limit: Option<usize>) -> Self {
        Self { start, end, limit }
    }

    /// 全部資料
    pub fn all() -> Self {
        Self::default()
    }

    /// 最新 n 筆
    pub fn latest(n: usize) -> Self {
        Self {
            limit: Some(n),
            ..Self::default()
        }
    }

    /// 日期是否落在區間內
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// 對已升冪排序的記錄套用區間與筆數限制
    pub fn apply(&self, records: Vec<CdsRecord>) -> Vec<CdsRecord> {
        let mut filtered: Vec<CdsRecord> = records
            .into_iter()
            .filter(|r| self.contains(r.date))
            .collect();

        if let Some(limit) = self.limit {
            let skip = filtered.len().saturating_sub(limit);
            filtered.drain(..skip);
        }

        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn series(n: u32) -> Vec<CdsRecord> {
        (1..=n).map(|d| CdsRecord::new(day(d), d as f64)).collect()
    }

    #[test]
    fn test_inclusive_range() {
        let query = RangeQuery::new(Some(day(3)), Some(day(5)), None);
        let dates: Vec<_> = query.apply(series(10)).into_iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(3), day(4), day(5)]);
    }

    #[test]
    fn test_limit_keeps_most_recent_ascending() {
        let result = RangeQuery::latest(5).apply(series(10));
        let closes: Vec<f64> = result.iter().map(|r| r.close).collect();
        assert_eq!(closes, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_limit_applies_after_range() {
        let query = RangeQuery::new(None, Some(day(4)), Some(2));
        let closes: Vec<f64> = query.apply(series(10)).iter().map(|r| r.close).collect();
        assert_eq!(closes, vec![3.0, 4.0]);
    }

    #[test]
    fn test_limit_larger_than_data() {
        assert_eq!(RangeQuery::latest(50).apply(series(3)).len(), 3);
        assert!(RangeQuery::all().apply(Vec::new()).is_empty());
    }
}
