use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use super::{cell_text, child_elements, TableStrategy};
use crate::data_ingestion::normalizer::{has_required_columns, normalize_table, RawTable};
use crate::domain_types::CdsRecord;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static THEAD_TH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("thead th").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));

/// 掃描頁面中所有 `<table>`，取第一個具有日期與收盤價欄位的表格
#[derive(Debug, Default, Clone, Copy)]
pub struct TableScanStrategy;

impl TableScanStrategy {
    pub fn new() -> Self {
        Self
    }

    /// 讀取單一表格為原始表格
    ///
    /// 欄位名稱取自 `<thead>` 的 `<th>`；沒有 `<thead>` 時，若第一列全部由
    /// `<th>` 組成則以其為欄位名稱。資料列為含 `<td>` 的 `<tr>`。
    pub fn read_table(table: ElementRef<'_>) -> RawTable {
        let mut headers: Vec<String> = table.select(&THEAD_TH).map(cell_text).collect();

        if headers.is_empty() {
            if let Some(first_row) = table.select(&ROW).next() {
                let cells: Vec<ElementRef<'_>> = first_row
                    .children()
                    .filter_map(ElementRef::wrap)
                    .collect();
                if !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th") {
                    headers = cells.into_iter().map(cell_text).collect();
                }
            }
        }

        let rows = table
            .select(&ROW)
            .map(|tr| child_elements(tr, "td").map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();

        RawTable::new(headers, rows)
    }
}

impl TableStrategy for TableScanStrategy {
    fn name(&self) -> &'static str {
        "table_scan"
    }

    fn extract(&self, document: &Html) -> Option<Vec<CdsRecord>> {
        // 只有標頭沒有資料列的表格不算候選
        let candidate = document
            .select(&TABLE)
            .map(Self::read_table)
            .find(|raw| {
                let ok = !raw.rows.is_empty() && has_required_columns(&raw.headers);
                trace!("表格欄位 {:?} 候選={}", raw.headers, ok);
                ok
            })?;

        Some(normalize_table(&candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_row_without_thead() {
        let html = Html::parse_document(
            r#"<table>
                 <tr><th>Date</th><th>Price</th><th>Open</th><th>Var. %</th></tr>
                 <tr><td>Nov 07, 2025</td><td>145,00</td><td>143,00</td><td>1,38%</td></tr>
               </table>"#,
        );

        let records = TableScanStrategy.extract(&html).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date.to_string(), "2025-11-07");
        assert!((records[0].close - 1.45).abs() < 1e-12);
        assert_eq!(records[0].change_pct, Some(1.38));
    }

    #[test]
    fn test_skips_tables_without_required_columns() {
        let html = Html::parse_document(
            r#"<table><thead><tr><th>Nome</th><th>Valor</th></tr></thead>
                 <tbody><tr><td>a</td><td>1</td></tr></tbody></table>
               <table><thead><tr><th>Data</th><th>Último</th></tr></thead>
                 <tbody><tr><td>03.01.2025</td><td>1,50</td></tr></tbody></table>"#,
        );

        let records = TableScanStrategy.extract(&html).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date.to_string(), "2025-01-03");
    }

    #[test]
    fn test_header_only_table_is_not_a_candidate() {
        let html = Html::parse_document(
            r#"<table><thead><tr><th>Data</th><th>Último</th></tr></thead></table>
               <table><thead><tr><th>Data</th><th>Último</th></tr></thead>
                 <tbody><tr><td>06.01.2025</td><td>1,60</td></tr></tbody></table>"#,
        );

        let records = TableScanStrategy.extract(&html).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date.to_string(), "2025-01-06");
    }

    #[test]
    fn test_no_candidate() {
        let html = Html::parse_document("<table><tr><td>x</td></tr></table>");
        assert!(TableScanStrategy.extract(&html).is_none());
    }

    #[test]
    fn test_read_table_skips_header_cells_in_rows() {
        let html = Html::parse_document(
            "<table><tr><th>Data</th><th>Último</th></tr><tr><td>1</td><td>2</td></tr></table>",
        );
        let table = html.select(&TABLE).next().unwrap();
        let raw = TableScanStrategy::read_table(table);
        assert_eq!(raw.headers, vec!["Data", "Último"]);
        assert_eq!(raw.rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }
}
