//! HTTP Error Handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::ApplicationError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const NOT_FOUND: i32 = 404;
    pub const INTERNAL_ERROR: i32 = 500;
}

/// API 错误
///
/// 只有两种对外可见结果：不存在 (404) 和内部故障 (500)
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

/// 随响应传递给日志中间件的错误详情
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// 错误在 `error_logging_middleware` 中统一记录一次，此处只构造响应
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errno, msg) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, errno::NOT_FOUND, msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                errno::INTERNAL_ERROR,
                msg,
            ),
        };

        let mut response = (status, Json(ErrorResponse::new(errno, msg.clone()))).into_response();
        response.extensions_mut().insert(ErrorDetail(msg));
        response
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
