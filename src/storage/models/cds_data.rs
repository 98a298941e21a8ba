use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use sqlx::types::Decimal;

use crate::domain_types::CdsRecord;
use crate::storage::error::{StorageError, StorageResult};

/// `NUMERIC(10, 4)` 可容納的絕對值上限
const NUMERIC_LIMIT: f64 = 1_000_000.0;

/// 小數位數
pub const NUMERIC_SCALE: u32 = 4;

/// cds_data 表的一列
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CdsDataRow {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub change_pct: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// cds_data 插入模型 (不包含自動生成的字段)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdsDataInsert {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Decimal,
    pub change_pct: Option<Decimal>,
}

fn to_numeric(value: f64, field: &str, date: NaiveDate) -> StorageResult<Decimal> {
    if !value.is_finite() || value.abs() >= NUMERIC_LIMIT {
        return Err(StorageError::InvalidData(format!(
            "{date} 的 {field} 超出 NUMERIC(10,4) 範圍: {value}"
        )));
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(NUMERIC_SCALE))
        .ok_or_else(|| StorageError::InvalidData(format!("{date} 的 {field} 無法轉換: {value}")))
}

fn to_opt_numeric(value: Option<f64>, field: &str, date: NaiveDate) -> StorageResult<Option<Decimal>> {
    value.map(|v| to_numeric(v, field, date)).transpose()
}

impl CdsDataInsert {
    pub fn from_record(record: &CdsRecord) -> StorageResult<Self> {
        let date = record.date;
        Ok(Self {
            date,
            open: to_opt_numeric(record.open, "open", date)?,
            high: to_opt_numeric(record.high, "high", date)?,
            low: to_opt_numeric(record.low, "low", date)?,
            close: to_numeric(record.close, "close", date)?,
            change_pct: to_opt_numeric(record.change_pct, "change_pct", date)?,
        })
    }
}

fn to_float(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl From<CdsDataRow> for CdsRecord {
    fn from(row: CdsDataRow) -> Self {
        CdsRecord::new(row.date, to_float(row.close))
            .with_ohlc(
                row.open.map(to_float),
                row.high.map(to_float),
                row.low.map(to_float),
            )
            .with_change_pct(row.change_pct.map(to_float))
    }
}
