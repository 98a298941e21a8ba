//! 表格標準化
//!
//! 將來源頁面的原始表格（葡文或英文欄位名）轉成標準 CDS 記錄。

use tracing::{debug, trace};

use super::number::{clean_number, parse_change_pct};
use crate::domain_types::{sort_by_date, CdsRecord};
use crate::utils::parse_day_first_date;

/// 標準欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Date,
    Open,
    High,
    Low,
    Close,
    ChangePct,
}

impl CanonicalField {
    /// 依欄位名稱判斷對應的標準欄位，依序比對，先符合者優先
    pub fn classify(header: &str) -> Option<Self> {
        let h = header.trim().to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| h.contains(n));

        if has(&["data", "date"]) {
            Some(Self::Date)
        } else if has(&["abert", "open"]) {
            Some(Self::Open)
        } else if has(&["máxima", "maxima", "high"]) {
            Some(Self::High)
        } else if has(&["mínima", "minima", "low"]) {
            Some(Self::Low)
        } else if has(&["último", "ultimo", "close", "price", "fech"]) {
            Some(Self::Close)
        } else if h.contains("var") && h.contains('%') {
            Some(Self::ChangePct)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::ChangePct => "change_pct",
        }
    }
}

/// 原始表格：欄位名稱加上文字儲存格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// 計算欄位對應
    pub fn column_map(&self) -> ColumnMap {
        ColumnMap::from_headers(&self.headers)
    }
}

/// 標準欄位到原始欄位索引的對應
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub open: Option<usize>,
    pub high: Option<usize>,
    pub low: Option<usize>,
    pub close: Option<usize>,
    pub change_pct: Option<usize>,
}

impl ColumnMap {
    /// 無法辨識的欄位會被丟棄；同一標準欄位出現多次時取第一個
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut map = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let Some(field) = CanonicalField::classify(header.as_ref()) else {
                trace!("忽略無法辨識的欄位: {}", header.as_ref());
                continue;
            };
            let slot = match field {
                CanonicalField::Date => &mut map.date,
                CanonicalField::Open => &mut map.open,
                CanonicalField::High => &mut map.high,
                CanonicalField::Low => &mut map.low,
                CanonicalField::Close => &mut map.close,
                CanonicalField::ChangePct => &mut map.change_pct,
            };
            slot.get_or_insert(idx);
        }
        map
    }

    /// 同時具有日期與收盤價欄位
    pub fn has_required(&self) -> bool {
        self.date.is_some() && self.close.is_some()
    }
}

/// 欄位名稱是否包含可辨識的日期與收盤價欄位
pub fn has_required_columns<S: AsRef<str>>(headers: &[S]) -> bool {
    ColumnMap::from_headers(headers).has_required()
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| row.get(i)).map(String::as_str)
}

/// 標準化原始表格
///
/// 日期以「日在前」解析；OHLC 以 [`clean_number`] 解析，漲跌幅以
/// [`parse_change_pct`] 解析。缺日期或缺收盤價的列被丟棄，結果依日期升冪排列。
/// 此階段允許重複日期，去重在合併時處理。
pub fn normalize_table(raw: &RawTable) -> Vec<CdsRecord> {
    let columns = raw.column_map();
    if columns.date.is_none() {
        debug!("表格缺少日期欄位，欄位: {:?}", raw.headers);
        return Vec::new();
    }

    let mut records: Vec<CdsRecord> = raw
        .rows
        .iter()
        .filter_map(|row| {
            let date = cell(row, columns.date).and_then(parse_day_first_date)?;
            let close = cell(row, columns.close).and_then(clean_number)?;

            Some(
                CdsRecord::new(date, close)
                    .with_ohlc(
                        cell(row, columns.open).and_then(clean_number),
                        cell(row, columns.high).and_then(clean_number),
                        cell(row, columns.low).and_then(clean_number),
                    )
                    .with_change_pct(cell(row, columns.change_pct).and_then(parse_change_pct)),
            )
        })
        .collect();

    sort_by_date(&mut records);

    debug!(
        "表格標準化完成: {} 列 -> {} 筆有效記錄",
        raw.rows.len(),
        records.len()
    );
    records
}
