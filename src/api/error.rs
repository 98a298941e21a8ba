use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

/// API 錯誤類型
#[derive(Error, Debug)]
pub enum ApiError {
    /// 查詢結果為空
    #[error("{0}")]
    NotFound(String),

    /// 查詢參數無效
    #[error("{0}")]
    InvalidParameter(String),

    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: StorageError,
    },
}

impl ApiError {
    pub fn storage(context: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Storage { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidParameter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Data not found",
            Self::InvalidParameter(_) => "Invalid parameter",
            Self::Storage { .. } => "Internal server error",
        }
    }
}

/// 錯誤回應內容
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("API 錯誤: {}", self);
        }

        let body = ErrorBody {
            error: self.title().to_string(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
