//! 更新流程：下載 → 擷取 → 寫入儲存

use std::io;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use super::error::{IngestionResult, UpdateError};
use super::extractor::{Extraction, Extractor};
use super::fetcher::Fetcher;
use crate::config::ScraperConfig;
use crate::domain_types::CdsStats;
use crate::monitor::PipelineMetrics;
use crate::storage::{CdsStorage, CsvStorage};

/// 一次更新的結果
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// 成功的擷取策略
    pub strategy: &'static str,
    /// 擷取到的列數
    pub scraped: usize,
    /// 寫入儲存的列數
    pub stored: usize,
    /// 寫入後的統計
    pub stats: CdsStats,
    pub elapsed: Duration,
}

/// CDS 資料更新器
#[derive(Debug)]
pub struct CdsUpdater {
    fetcher: Fetcher,
    extractor: Extractor,
}

impl CdsUpdater {
    pub fn new(fetcher: Fetcher, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    pub fn from_config(config: &ScraperConfig) -> IngestionResult<Self> {
        Ok(Self::new(Fetcher::new(config)?, Extractor::from_config(config)?))
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// 下載並擷取，不寫入儲存
    pub async fn scrape(&self) -> IngestionResult<Extraction> {
        let html = self.fetcher.fetch().await?;
        match self.extractor.extract(&html) {
            Ok(extraction) => {
                PipelineMetrics::record_extraction(extraction.strategy, extraction.records.len());
                Ok(extraction)
            }
            Err(e) => {
                PipelineMetrics::record_extraction_failure();
                Err(e)
            }
        }
    }

    /// 下載並擷取後以 CSV 寫到 `writer`，不寫入儲存
    ///
    /// `writer` 只會收到 CSV 內容，日誌走 stderr 或日誌檔。
    pub async fn preview<W: io::Write>(&self, writer: W) -> Result<Extraction, UpdateError> {
        let extraction = self.scrape().await?;
        info!(
            "dry-run: 使用 {} 擷取到 {} 筆記錄，未寫入儲存",
            extraction.strategy,
            extraction.records.len()
        );
        CsvStorage::write_records(writer, &extraction.records)?;
        Ok(extraction)
    }

    /// 執行完整更新
    #[instrument(skip_all, fields(backend = %storage.backend()))]
    pub async fn run(&self, storage: &dyn CdsStorage) -> Result<UpdateReport, UpdateError> {
        let started = Instant::now();
        let result = self.run_inner(storage, started).await;
        PipelineMetrics::record_run(started.elapsed(), result.is_ok());

        match &result {
            Ok(report) => info!(
                "更新完成: 擷取 {} 筆 ({})，寫入 {} 筆，共 {} 筆，耗時 {:.2} 秒",
                report.scraped,
                report.strategy,
                report.stored,
                report.stats.total_records,
                report.elapsed.as_secs_f64()
            ),
            Err(e) => error!("更新失敗: {}", e),
        }
        result
    }

    async fn run_inner(&self, storage: &dyn CdsStorage, started: Instant) -> Result<UpdateReport, UpdateError> {
        let extraction = self.scrape().await?;
        let scraped = extraction.records.len();

        let stored = storage.store_batch(&extraction.records).await?;
        PipelineMetrics::record_stored(storage.backend().as_str(), stored);

        let stats = storage.get_stats().await?;

        Ok(UpdateReport {
            strategy: extraction.strategy,
            scraped,
            stored,
            stats,
            elapsed: started.elapsed(),
        })
    }
}
