//! 匯入前的 CSV 資料檢查
//!
//! 缺少標準欄位或日期無法解析視為無效；空值、重複日期與 OHLC 不一致只產生警告，
//! 匯入時重複日期以最後一筆為準。

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::Read;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::domain_types::CANONICAL_COLUMNS;
use crate::utils::{parse_day_first_date, parse_iso_date};

/// 驗證報告
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// 資料列數（不含標頭）
    pub total_rows: usize,
    /// 缺少的標準欄位
    pub missing_columns: Vec<String>,
    /// 各欄位的空值數
    pub null_counts: BTreeMap<String, usize>,
    /// 日期無法解析的行號（標頭為第 1 行）
    pub invalid_dates: Vec<usize>,
    /// 出現超過一次的日期
    pub duplicate_dates: Vec<NaiveDate>,
    /// high < low，或 open/close 落在 [low, high] 之外的日期
    pub inconsistent_ohlc: Vec<NaiveDate>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing_columns.is_empty() && self.invalid_dates.is_empty()
    }

    pub fn total_nulls(&self) -> usize {
        self.null_counts.values().sum()
    }

    /// 不影響匯入的問題
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (column, count) in self.null_counts.iter().filter(|(_, c)| **c > 0) {
            warnings.push(format!("欄位 {column} 有 {count} 個空值"));
        }
        if !self.duplicate_dates.is_empty() {
            warnings.push(format!(
                "{} 個重複日期，將保留最後一筆",
                self.duplicate_dates.len()
            ));
        }
        if !self.inconsistent_ohlc.is_empty() {
            warnings.push(format!("{} 筆 OHLC 數值不一致", self.inconsistent_ohlc.len()));
        }
        warnings
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "總列數: {}", self.total_rows)?;
        if !self.missing_columns.is_empty() {
            writeln!(f, "缺少欄位: {}", self.missing_columns.join(", "))?;
        }
        if !self.invalid_dates.is_empty() {
            writeln!(f, "無效日期: {} 列", self.invalid_dates.len())?;
        }
        for warning in self.warnings() {
            writeln!(f, "警告: {warning}")?;
        }
        write!(f, "結果: {}", if self.is_valid() { "通過" } else { "失敗" })
    }
}

fn field<'r>(index: &BTreeMap<&str, usize>, row: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
    index
        .get(name)
        .and_then(|i| row.get(*i))
        .filter(|v| !v.is_empty())
}

fn parse_number(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_inconsistent(open: Option<f64>, high: Option<f64>, low: Option<f64>, close: Option<f64>) -> bool {
    match (high, low) {
        (Some(h), Some(l)) => {
            h < l
                || [open, close]
                    .into_iter()
                    .flatten()
                    .any(|v| v > h || v < l)
        }
        _ => false,
    }
}

/// 檢查 CSV 內容
pub fn validate_csv<R: Read>(reader: R) -> Result<ValidationReport, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let index: BTreeMap<&str, usize> = CANONICAL_COLUMNS
        .iter()
        .filter_map(|c| headers.iter().position(|h| h == c).map(|i| (*c, i)))
        .collect();

    let mut report = ValidationReport {
        missing_columns: CANONICAL_COLUMNS
            .iter()
            .filter(|c| !index.contains_key(*c))
            .map(|c| c.to_string())
            .collect(),
        null_counts: index.keys().map(|c| (c.to_string(), 0)).collect(),
        ..ValidationReport::default()
    };

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();

    for (row_idx, row) in csv_reader.records().enumerate() {
        let row = row?;
        let line = row_idx + 2;
        report.total_rows += 1;

        for (name, count) in report.null_counts.iter_mut() {
            if field(&index, &row, name).is_none() {
                *count += 1;
            }
        }

        let Some(raw_date) = field(&index, &row, "date") else {
            continue;
        };
        let Some(date) = parse_iso_date(raw_date)
            .ok()
            .or_else(|| parse_day_first_date(raw_date))
        else {
            report.invalid_dates.push(line);
            continue;
        };

        if !seen.insert(date) && reported.insert(date) {
            report.duplicate_dates.push(date);
        }

        let value = |name: &str| field(&index, &row, name).and_then(parse_number);
        if is_inconsistent(value("open"), value("high"), value("low"), value("close")) {
            report.inconsistent_ohlc.push(date);
        }
    }

    for warning in report.warnings() {
        warn!("{}", warning);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_file_is_valid() {
        let data = "date,open,high,low,close,change_pct\n\
                    2025-01-02,1.1,1.3,1.0,1.2,0.5\n\
                    2025-01-03,1.2,1.4,1.1,1.3,0.8\n";

        let report = validate_csv(data.as_bytes()).unwrap();

        assert!(report.is_valid());
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.total_nulls(), 0);
        assert!(report.warnings().is_empty());
    }

    #[test]
    fn test_missing_columns_invalidate() {
        let data = "date,close\n2025-01-02,1.2\n";

        let report = validate_csv(data.as_bytes()).unwrap();

        assert!(!report.is_valid());
        assert_eq!(report.missing_columns, vec!["open", "high", "low", "change_pct"]);
    }

    #[test]
    fn test_nulls_and_duplicates_are_warnings() {
        let data = "Date,Open,High,Low,Close,Change_Pct\n\
                    2025-01-02,,1.3,1.0,1.2,\n\
                    2025-01-02,1.1,1.3,1.0,1.25,0.1\n\
                    2025-01-02,1.1,1.3,1.0,1.26,0.1\n";

        let report = validate_csv(data.as_bytes()).unwrap();

        assert!(report.is_valid());
        assert_eq!(report.null_counts["open"], 1);
        assert_eq!(report.null_counts["change_pct"], 1);
        assert_eq!(report.null_counts["close"], 0);
        assert_eq!(
            report.duplicate_dates,
            vec![NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()]
        );
        assert_eq!(report.warnings().len(), 3);
    }

    #[test]
    fn test_invalid_dates_and_ohlc() {
        let data = "date,open,high,low,close,change_pct\n\
                    someday,1,1,1,1,0\n\
                    2025-01-03,1.2,1.0,1.4,1.3,0.8\n";

        let report = validate_csv(data.as_bytes()).unwrap();

        assert!(!report.is_valid());
        assert_eq!(report.invalid_dates, vec![2]);
        assert_eq!(report.inconsistent_ohlc.len(), 1);
        assert!(report.to_string().ends_with("結果: 失敗"));
    }
}
