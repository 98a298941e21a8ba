//! HTML 表格擷取
//!
//! 依序嘗試多個擷取策略，第一個產生非空結果的策略勝出。
//! 全部失敗時回傳 [`IngestionError::TableNotFound`]，與網路錯誤區分。

pub mod path_query;
pub mod table_scan;

use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

pub use path_query::{PathQueryStrategy, StructuralQuery};
pub use table_scan::TableScanStrategy;

use super::error::{IngestionError, IngestionResult};
use crate::config::ScraperConfig;
use crate::domain_types::CdsRecord;

/// 表格擷取策略
///
/// 實作必須是同步的：`Html` 不是 `Send`，不能跨越 await。
pub trait TableStrategy: Send + Sync {
    /// 策略名稱，用於日誌與指標
    fn name(&self) -> &'static str;

    /// 從已解析的文件擷取記錄，找不到可用表格時回傳 `None`
    fn extract(&self, document: &Html) -> Option<Vec<CdsRecord>>;
}

/// 擷取結果
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub strategy: &'static str,
    pub records: Vec<CdsRecord>,
}

/// 策略鏈
pub struct Extractor {
    strategies: Vec<Box<dyn TableStrategy>>,
}

impl Extractor {
    /// 預設策略鏈：表格掃描，再以結構查詢作為後備
    pub fn new(table_query: &str) -> IngestionResult<Self> {
        Ok(Self::empty()
            .with_strategy(TableScanStrategy::new())
            .with_strategy(PathQueryStrategy::new(table_query)?))
    }

    pub fn from_config(config: &ScraperConfig) -> IngestionResult<Self> {
        Self::new(&config.table_query)
    }

    /// 沒有任何策略的擷取器
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// 在鏈尾加入策略
    pub fn with_strategy<S: TableStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// 從 HTML 原文擷取記錄
    pub fn extract(&self, markup: &str) -> IngestionResult<Extraction> {
        let document = Html::parse_document(markup);

        for (idx, strategy) in self.strategies.iter().enumerate() {
            match strategy.extract(&document) {
                Some(records) if !records.is_empty() => {
                    info!(
                        "使用 {} 擷取到 {} 筆記錄",
                        strategy.name(),
                        records.len()
                    );
                    return Ok(Extraction {
                        strategy: strategy.name(),
                        records,
                    });
                }
                _ => {
                    if idx + 1 < self.strategies.len() {
                        warn!("{} 未找到表格，改用下一個策略", strategy.name());
                    } else {
                        debug!("{} 未找到表格", strategy.name());
                    }
                }
            }
        }

        Err(IngestionError::TableNotFound {
            tried: self.strategy_names().join(", "),
        })
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

/// 儲存格文字：串接所有文字節點，壓縮空白
pub(crate) fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 直接子元素中名稱符合者
pub(crate) fn child_elements<'a>(
    element: ElementRef<'a>,
    name: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name().eq_ignore_ascii_case(name))
}
