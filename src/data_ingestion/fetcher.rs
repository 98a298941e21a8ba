//! 來源頁面下載
//!
//! 以瀏覽器標頭送出 GET，對暫時性錯誤自動重試並指數退避。

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, info, warn};

use super::error::{IngestionError, IngestionResult};
use crate::config::ScraperConfig;
use crate::monitor::PipelineMetrics;

/// 瀏覽器預設的 Accept 標頭
pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// 重試策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// 首次請求之外的最多重試次數
    pub retries: u32,
    /// 退避係數（秒）
    pub backoff_factor: f64,
    /// 單次等待上限
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_factor: 0.8,
            max_backoff: Self::MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

    /// 視為暫時性錯誤的狀態碼
    pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
        StatusCode::TOO_MANY_REQUESTS,
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::BAD_GATEWAY,
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::GATEWAY_TIMEOUT,
    ];

    pub fn new(retries: u32, backoff_factor: f64) -> Self {
        Self {
            retries,
            backoff_factor,
            max_backoff: Self::MAX_BACKOFF,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.retries, config.backoff_factor)
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        Self::RETRYABLE_STATUSES.contains(&status)
    }

    /// 只重試安全方法
    pub fn is_retryable_method(method: &Method) -> bool {
        *method == Method::GET || *method == Method::HEAD
    }

    /// 第 `retry` 次重試（從 1 開始）前的等待時間：`factor * 2^(retry-1)`，有上限
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(31) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// 實際等待時間：429/503 帶有 `Retry-After` 時以其為準
    pub fn delay(&self, retry: u32, status: Option<StatusCode>, retry_after: Option<Duration>) -> Duration {
        let honours_header = matches!(
            status,
            Some(StatusCode::TOO_MANY_REQUESTS) | Some(StatusCode::SERVICE_UNAVAILABLE)
        );
        match retry_after {
            Some(wait) if honours_header => wait.min(self.max_backoff),
            _ => self.backoff(retry),
        }
    }
}

/// 解析以秒為單位的 `Retry-After`
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// 頁面下載器
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    url: String,
}

impl Fetcher {
    pub fn new(config: &ScraperConfig) -> IngestionResult<Self> {
        let header = |value: &str, name: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| IngestionError::Client(format!("無效的 {name} 標頭: {e}")))
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, header(&config.accept_language, "Accept-Language")?);
        if !config.referer.is_empty() {
            headers.insert(REFERER, header(&config.referer, "Referer")?);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| IngestionError::Client(e.to_string()))?;

        Ok(Self {
            client,
            policy: RetryPolicy::from_config(config),
            url: config.url.clone(),
        })
    }

    /// 覆寫重試策略
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn source_url(&self) -> &str {
        &self.url
    }

    /// 下載已配置的來源頁面
    pub async fn fetch(&self) -> IngestionResult<String> {
        self.fetch_html(&self.url).await
    }

    /// 下載指定網址並回傳 HTML 原文
    pub async fn fetch_html(&self, url: &str) -> IngestionResult<String> {
        info!("下載頁面: {}", url);
        let response = self.send_with_retry(Method::GET, url).await?;
        let body = response.text().await?;
        debug!("頁面大小: {} bytes", body.len());
        Ok(body)
    }

    /// 送出請求；非 2xx 在重試用盡後以 [`IngestionError::Status`] 回傳
    pub async fn send_with_retry(&self, method: Method, url: &str) -> IngestionResult<Response> {
        let retryable_method = RetryPolicy::is_retryable_method(&method);
        let mut retries_used = 0u32;

        loop {
            let can_retry = retryable_method && retries_used < self.policy.retries;

            match self.client.request(method.clone(), url).send().await {
                Ok(response) if response.status().is_success() => {
                    PipelineMetrics::record_fetch_attempt("success");
                    return Ok(response);
                }
                Ok(response) => {
                    PipelineMetrics::record_fetch_attempt("status");
                    let status = response.status();
                    if !(can_retry && RetryPolicy::is_retryable_status(status)) {
                        warn!("請求 {} 失敗: HTTP {}", url, status);
                        return Err(IngestionError::Status {
                            status,
                            url: url.to_string(),
                        });
                    }

                    retries_used += 1;
                    let delay = self
                        .policy
                        .delay(retries_used, Some(status), retry_after(&response));
                    warn!(
                        "HTTP {}，{:.1} 秒後重試 ({}/{})",
                        status,
                        delay.as_secs_f64(),
                        retries_used,
                        self.policy.retries
                    );
                    PipelineMetrics::record_retry("status", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    PipelineMetrics::record_fetch_attempt("error");
                    if !(can_retry && (e.is_connect() || e.is_timeout())) {
                        warn!("請求 {} 失敗: {}", url, e);
                        return Err(e.into());
                    }

                    retries_used += 1;
                    let delay = self.policy.backoff(retries_used);
                    warn!(
                        "連線錯誤 ({})，{:.1} 秒後重試 ({}/{})",
                        e,
                        delay.as_secs_f64(),
                        retries_used,
                        self.policy.retries
                    );
                    PipelineMetrics::record_retry(if e.is_timeout() { "timeout" } else { "connect" }, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::extract::State;
    use axum::http::HeaderMap as AxumHeaders;
    use axum::routing::get;
    use axum::Router;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[rstest]
    #[case(1, 0.8)]
    #[case(2, 1.6)]
    #[case(3, 3.2)]
    #[case(20, 120.0)]
    fn test_backoff(#[case] retry: u32, #[case] expected: f64) {
        let policy = RetryPolicy::new(3, 0.8);
        assert!((policy.backoff(retry).as_secs_f64() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_retry_after_precedence() {
        let policy = RetryPolicy::new(3, 0.8);
        let header = Some(Duration::from_secs(7));

        assert_eq!(policy.delay(1, Some(StatusCode::TOO_MANY_REQUESTS), header), Duration::from_secs(7));
        assert_eq!(policy.delay(1, Some(StatusCode::SERVICE_UNAVAILABLE), header), Duration::from_secs(7));
        // 其他狀態碼忽略 Retry-After
        assert_eq!(policy.delay(1, Some(StatusCode::BAD_GATEWAY), header), policy.backoff(1));
        assert_eq!(
            policy.delay(1, Some(StatusCode::TOO_MANY_REQUESTS), Some(Duration::from_secs(900))),
            RetryPolicy::MAX_BACKOFF
        );
    }

    #[test]
    fn test_retryable_classification() {
        for status in [429u16, 500, 502, 503, 504] {
            assert!(RetryPolicy::is_retryable_status(StatusCode::from_u16(status).unwrap()));
        }
        assert!(!RetryPolicy::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::FORBIDDEN));
        assert!(RetryPolicy::is_retryable_method(&Method::GET));
        assert!(RetryPolicy::is_retryable_method(&Method::HEAD));
        assert!(!RetryPolicy::is_retryable_method(&Method::POST));
    }

    /// 前 `failures` 次回傳 `status`，之後回傳 200
    #[derive(Clone)]
    struct Flaky {
        hits: Arc<AtomicUsize>,
        failures: usize,
        status: StatusCode,
    }

    async fn flaky_page(State(state): State<Flaky>, headers: AxumHeaders) -> (StatusCode, String) {
        let n = state.hits.fetch_add(1, Ordering::SeqCst);
        assert!(headers.get("user-agent").is_some());
        assert!(headers.get("accept-language").is_some());
        if n < state.failures {
            (state.status, "unavailable".to_string())
        } else {
            (StatusCode::OK, "<html><body>ok</body></html>".to_string())
        }
    }

    async fn serve(failures: usize, status: StatusCode) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = Flaky {
            hits: hits.clone(),
            failures,
            status,
        };
        let app = Router::new()
            .route("/page", get(flaky_page).post(flaky_page))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/page"), hits)
    }

    fn fetcher(retries: u32) -> Fetcher {
        let config = ScraperConfig {
            retries,
            backoff_factor: 0.0,
            timeout_secs: 5,
            ..ScraperConfig::default()
        };
        Fetcher::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_retries_transient_status_then_succeeds() {
        let (url, hits) = serve(2, StatusCode::SERVICE_UNAVAILABLE).await;

        let body = fetcher(3).fetch_html(&url).await.unwrap();

        assert!(body.contains("ok"));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_configured_retries() {
        let (url, hits) = serve(10, StatusCode::BAD_GATEWAY).await;

        let err = fetcher(2).fetch_html(&url).await.unwrap_err();

        assert_matches!(err, IngestionError::Status { status, .. } if status == StatusCode::BAD_GATEWAY);
        assert!(err.is_network());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_not_found() {
        let (url, hits) = serve(10, StatusCode::NOT_FOUND).await;

        let err = fetcher(3).fetch_html(&url).await.unwrap_err();

        assert_matches!(err, IngestionError::Status { status, .. } if status == StatusCode::NOT_FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_does_not_retry_unsafe_method() {
        let (url, hits) = serve(10, StatusCode::SERVICE_UNAVAILABLE).await;

        let err = fetcher(3).send_with_retry(Method::POST, &url).await.unwrap_err();

        assert_matches!(err, IngestionError::Status { .. });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(1)
            .fetch_html(&format!("http://{addr}/page"))
            .await
            .unwrap_err();

        assert_matches!(err, IngestionError::Http(_));
        assert!(err.is_network());
    }
}
