// 模組定義
pub mod api;
pub mod config;
pub mod data_ingestion;
pub mod domain_types;
pub mod monitor;
pub mod storage;
pub mod utils;
