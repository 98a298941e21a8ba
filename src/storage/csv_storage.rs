//! CSV 檔案儲存
//!
//! 單一寫入者；沒有檔案鎖。寫入先落在暫存檔再改名覆蓋，避免中途失敗留下半個檔案。

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use super::traits::{CdsStorage, StorageBackend};
use crate::config::StorageConfig;
use crate::domain_types::{merge_and_dedup, sort_by_date, CdsRecord, CdsStats, RangeQuery, CANONICAL_COLUMNS};
use crate::utils::{current_backup_timestamp, parse_day_first_date, parse_iso_date};

/// 讀取時使用的寬鬆列格式：無法解析的數值欄位視為缺值
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    date: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    change_pct: Option<f64>,
}

impl CsvRow {
    fn into_record(self) -> Option<CdsRecord> {
        let date = parse_iso_date(self.date.trim())
            .ok()
            .or_else(|| parse_day_first_date(&self.date))?;
        let close = self.close.filter(|v| v.is_finite())?;
        Some(
            CdsRecord::new(date, close)
                .with_ohlc(self.open, self.high, self.low)
                .with_change_pct(self.change_pct),
        )
    }
}

/// CSV 儲存後端
#[derive(Debug, Clone)]
pub struct CsvStorage {
    path: PathBuf,
    backup: bool,
}

impl CsvStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup: true,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.csv_path).with_backup(config.backup)
    }

    /// 寫入前是否備份既有檔案
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 備份檔路徑：`<stem>__bkp_<timestamp>.csv`，與原檔同目錄
    pub fn backup_path(&self, timestamp: &str) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cds".to_string());
        self.path.with_file_name(format!("{stem}__bkp_{timestamp}.csv"))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// 從任意來源讀取記錄，略過缺日期或缺收盤價的列
    pub fn read_records<R: io::Read>(reader: R) -> StorageResult<Vec<CdsRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();
        for (idx, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let row = row?;
            match row.into_record() {
                Some(record) => records.push(record),
                // 標頭為第 1 行
                None => warn!("略過無效的 CSV 列 (第 {} 行)", idx + 2),
            }
        }

        sort_by_date(&mut records);
        Ok(records)
    }

    /// 以標準欄位順序寫出，缺值為空欄位
    pub fn write_records<W: io::Write>(writer: W, records: &[CdsRecord]) -> StorageResult<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(CANONICAL_COLUMNS)?;
        for record in records {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// 讀取檔案；檔案不存在時回傳空集合
    pub fn load_data(&self) -> StorageResult<Vec<CdsRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("CSV 檔案不存在: {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records = Self::read_records(file)?;
        debug!("從 {} 載入 {} 筆記錄", self.path.display(), records.len());
        Ok(records)
    }

    /// 複製既有檔案為帶時間戳的備份；失敗只記錄警告
    pub fn create_backup(&self) -> Option<PathBuf> {
        if !self.path.exists() {
            return None;
        }

        let backup = self.backup_path(&current_backup_timestamp());
        match fs::copy(&self.path, &backup) {
            Ok(_) => {
                info!("已建立備份: {}", backup.display());
                Some(backup)
            }
            Err(e) => {
                warn!("建立備份失敗 {}: {}", backup.display(), e);
                None
            }
        }
    }

    /// 寫入完整資料集
    pub fn save_data(&self, records: &[CdsRecord], create_backup: bool) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        if create_backup {
            self.create_backup();
        }

        let temp = self.temp_path();
        let result = File::create(&temp)
            .map_err(StorageError::from)
            .and_then(|file| Self::write_records(io::BufWriter::new(file), records))
            .and_then(|_| fs::rename(&temp, &self.path).map_err(StorageError::from));

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        } else {
            info!("已寫入 {} 筆記錄至 {}", records.len(), self.path.display());
        }
        result
    }

    /// 讀取、合併新批次後寫回，回傳合併後的完整資料
    pub fn update_from_scraper(&self, batch: Vec<CdsRecord>) -> StorageResult<Vec<CdsRecord>> {
        let existing = self.load_data()?;
        let before = existing.len();
        let merged = merge_and_dedup(existing, batch);

        info!(
            "合併完成: 原有 {} 筆，合併後 {} 筆",
            before,
            merged.len()
        );
        self.save_data(&merged, self.backup)?;
        Ok(merged)
    }

    async fn blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(CsvStorage) -> StorageResult<T> + Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || f(storage)).await?
    }
}

#[async_trait]
impl CdsStorage for CsvStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Csv
    }

    async fn load_existing(&self) -> StorageResult<Vec<CdsRecord>> {
        self.blocking(|s| s.load_data()).await
    }

    async fn store_batch(&self, batch: &[CdsRecord]) -> StorageResult<usize> {
        let unique = merge_and_dedup(Vec::new(), batch.iter().cloned());
        let count = unique.len();
        self.blocking(move |s| s.update_from_scraper(unique)).await?;
        Ok(count)
    }

    async fn get(&self, query: RangeQuery) -> StorageResult<Vec<CdsRecord>> {
        self.blocking(move |s| Ok(query.apply(s.load_data()?))).await
    }

    async fn get_stats(&self) -> StorageResult<CdsStats> {
        self.blocking(|s| Ok(CdsStats::from_records(&s.load_data()?)))
            .await
    }

    async fn health_check(&self) -> bool {
        if self.path.exists() {
            return fs::metadata(&self.path).map(|m| m.is_file()).unwrap_or(false);
        }
        self.path
            .parent()
            .map_or(true, |p| p.as_os_str().is_empty() || p.is_dir())
    }
}
