use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::storage::CdsStorage;

/// 處理器共享狀態
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn CdsStorage>,
    /// 未安裝 Prometheus 記錄器時 `/metrics` 回傳 404
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(storage: Arc<dyn CdsStorage>) -> Self {
        Self {
            storage,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
