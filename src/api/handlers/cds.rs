use std::time::Instant;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::api::{ApiError, ApiResult, AppState};
use crate::domain_types::{CdsRecord, CdsStats, RangeQuery};
use crate::monitor::PipelineMetrics;
use crate::utils::parse_opt_iso_date;

/// 區間查詢筆數上限
pub const MAX_LIMIT: i64 = 10_000;
/// 最新資料筆數上限
pub const MAX_LATEST: i64 = 1_000;
pub const DEFAULT_LATEST: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct CdsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub n: Option<i64>,
}

fn check_range(name: &str, value: i64, max: i64) -> ApiResult<usize> {
    if (1..=max).contains(&value) {
        Ok(value as usize)
    } else {
        Err(ApiError::InvalidParameter(format!(
            "{name} must be between 1 and {max}, got {value}"
        )))
    }
}

fn parse_date(name: &str, value: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    parse_opt_iso_date(value).map_err(|_| {
        ApiError::InvalidParameter(format!(
            "{name} must be a YYYY-MM-DD date, got {:?}",
            value.unwrap_or_default()
        ))
    })
}

fn rejection(e: QueryRejection) -> ApiError {
    ApiError::InvalidParameter(e.body_text())
}

impl CdsQuery {
    pub fn to_range(&self) -> ApiResult<RangeQuery> {
        let start = parse_date("start_date", self.start_date.as_deref())?;
        let end = parse_date("end_date", self.end_date.as_deref())?;
        let limit = self
            .limit
            .map(|l| check_range("limit", l, MAX_LIMIT))
            .transpose()?;
        Ok(RangeQuery::new(start, end, limit))
    }
}

/// GET /cds
pub async fn get_cds(
    State(state): State<AppState>,
    query: Result<Query<CdsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CdsRecord>>> {
    let Query(query) = query.map_err(rejection)?;
    let range = query.to_range()?;
    debug!("查詢 CDS 區間: {:?}", range);

    let started = Instant::now();
    let records = state
        .storage
        .get(range)
        .await
        .map_err(ApiError::storage("Error retrieving CDS data"))?;
    PipelineMetrics::record_query("cds", records.len(), started.elapsed());

    if records.is_empty() {
        return Err(ApiError::NotFound(
            "No CDS data found for the specified criteria".to_string(),
        ));
    }
    Ok(Json(records))
}

/// GET /cds/latest
pub async fn get_latest(
    State(state): State<AppState>,
    query: Result<Query<LatestQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CdsRecord>>> {
    let Query(query) = query.map_err(rejection)?;
    let n = check_range("n", query.n.unwrap_or(DEFAULT_LATEST), MAX_LATEST)?;

    let started = Instant::now();
    let records = state
        .storage
        .get_latest(n)
        .await
        .map_err(ApiError::storage("Error retrieving latest CDS data"))?;
    PipelineMetrics::record_query("cds_latest", records.len(), started.elapsed());

    if records.is_empty() {
        return Err(ApiError::NotFound("No CDS data available".to_string()));
    }
    Ok(Json(records))
}

/// GET /cds/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<CdsStats>> {
    let started = Instant::now();
    let stats = state
        .storage
        .get_stats()
        .await
        .map_err(ApiError::storage("Error retrieving CDS statistics"))?;
    PipelineMetrics::record_query("cds_stats", 1, started.elapsed());
    Ok(Json(stats))
}
