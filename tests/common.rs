#![allow(dead_code)]

use brazil_cds::domain_types::CdsRecord;
use chrono::NaiveDate;

/// 資料表在 `<thead>` 之下的標準頁面
pub const HISTORY_PAGE: &str = include_str!("fixtures/history_page.html");

/// 第一個表格欄位正確但沒有可解析的數值，實際資料表需靠結構查詢定位
pub const DECOY_PAGE: &str = include_str!("fixtures/decoy_page.html");

/// 命中 DECOY_PAGE 實際資料表的結構查詢
pub const DECOY_QUERY: &str = "//div[@id='history']/table[1]";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2025-03-01 起連續 `n` 天，收盤價等於日序
pub fn series(n: u32) -> Vec<CdsRecord> {
    (1..=n)
        .map(|d| CdsRecord::new(day(2025, 3, d), d as f64))
        .collect()
}

/// 在本機隨機埠提供固定 HTML，回傳網址
pub async fn serve_html(body: &'static str) -> String {
    use axum::{response::Html, routing::get, Router};

    let app = Router::new().route("/historical-data", get(move || async move { Html(body) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/historical-data")
}
