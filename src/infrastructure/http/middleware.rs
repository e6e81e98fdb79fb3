//! HTTP Middleware
//!
//! HTTP 状态码错误日志中间件

use axum::{extract::Request, middleware::Next, response::Response};

use super::dto::CACHE_KEY_HEADER;
use super::error::ErrorDetail;

/// HTTP 状态码错误日志中间件
///
/// 当状态码为 4xx 或 5xx 时记录日志，附带响应中的内容标识。
/// 每个失败请求只在这里记录一次，错误详情由 `ApiError` 放入响应扩展
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();
    let cache_key = response
        .headers()
        .get(CACHE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let detail = response
        .extensions()
        .get::<ErrorDetail>()
        .map(|d| d.0.as_str())
        .unwrap_or("-");

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            cache_key = %cache_key,
            error = %detail,
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            cache_key = %cache_key,
            error = %detail,
            "HTTP client error"
        );
    }

    response
}
