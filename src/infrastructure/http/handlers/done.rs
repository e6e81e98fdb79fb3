//! Done Handler - 完成标记查询

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::application::CheckDoneQuery;
use crate::infrastructure::http::dto::{IdentityQuery, CACHE_KEY_HEADER};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// GET /done
///
/// 200: 完成标记存在；404: 不存在；500: 查询失败
pub async fn check_done(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<IdentityQuery>,
) -> Response {
    let key = state.identity.resolve(&headers, &query);
    let cache_key = [(CACHE_KEY_HEADER, key.to_string())];

    match state
        .check_done_handler
        .handle(CheckDoneQuery { key })
        .await
    {
        Ok(marker) if marker.is_done() => (cache_key, StatusCode::OK).into_response(),
        Ok(_) => (cache_key, StatusCode::NOT_FOUND).into_response(),
        Err(e) => (cache_key, ApiError::from(e)).into_response(),
    }
}
