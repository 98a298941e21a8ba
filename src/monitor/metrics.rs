// monitor/metrics.rs - 抓取與查詢指標

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::monitor::{MonitorError, MonitorResult};

/// 監控指標命名空間
pub const METRIC_NAMESPACE: &str = "brazil_cds";

/// 更新流程與 API 的指標記錄器
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// 記錄一次 HTTP 抓取嘗試
    ///
    /// `outcome` 為 `success`、`status` 或 `error`
    pub fn record_fetch_attempt(outcome: &'static str) {
        counter!(
            format!("{}.fetch_attempts", METRIC_NAMESPACE),
            "outcome" => outcome
        )
        .increment(1);
    }

    /// 記錄一次重試與其原因
    pub fn record_retry(reason: &'static str, delay: Duration) {
        counter!(
            format!("{}.http_retries", METRIC_NAMESPACE),
            "reason" => reason
        )
        .increment(1);
        histogram!(format!("{}.retry_delay_seconds", METRIC_NAMESPACE)).record(delay.as_secs_f64());
    }

    /// 記錄成功的擷取策略與列數
    pub fn record_extraction(strategy: &'static str, rows: usize) {
        counter!(
            format!("{}.extraction", METRIC_NAMESPACE),
            "strategy" => strategy
        )
        .increment(1);
        histogram!(
            format!("{}.extracted_rows", METRIC_NAMESPACE),
            "strategy" => strategy
        )
        .record(rows as f64);
    }

    /// 記錄所有策略都失敗
    pub fn record_extraction_failure() {
        counter!(format!("{}.extraction_failures", METRIC_NAMESPACE)).increment(1);
    }

    /// 記錄寫入儲存的筆數
    pub fn record_stored(backend: &'static str, count: usize) {
        counter!(
            format!("{}.rows_stored", METRIC_NAMESPACE),
            "backend" => backend
        )
        .increment(count as u64);
    }

    /// 記錄一次完整的更新流程
    pub fn record_run(duration: Duration, success: bool) {
        let result = if success { "success" } else { "failure" };
        counter!(
            format!("{}.update_runs", METRIC_NAMESPACE),
            "result" => result
        )
        .increment(1);
        histogram!(
            format!("{}.update_duration_seconds", METRIC_NAMESPACE),
            "result" => result
        )
        .record(duration.as_secs_f64());
    }

    /// 記錄 API 查詢
    pub fn record_query(endpoint: &'static str, rows: usize, duration: Duration) {
        counter!(
            format!("{}.api_queries", METRIC_NAMESPACE),
            "endpoint" => endpoint
        )
        .increment(1);
        histogram!(
            format!("{}.api_query_seconds", METRIC_NAMESPACE),
            "endpoint" => endpoint
        )
        .record(duration.as_secs_f64());
        histogram!(
            format!("{}.api_rows", METRIC_NAMESPACE),
            "endpoint" => endpoint
        )
        .record(rows as f64);
    }
}

/// 安裝全域 Prometheus 記錄器，回傳用於輸出 `/metrics` 的 handle
pub fn install_prometheus_recorder() -> MonitorResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MonitorError::MetricsError(format!("無法安裝 Prometheus 記錄器: {}", e)))
}
