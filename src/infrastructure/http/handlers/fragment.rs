//! Fragment Handler - 分片内容

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::{future, stream, StreamExt};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::application::{
    CachedFragment, GetFragmentQuery, GetFragmentResponse, KeepAliveTicket,
};
use crate::infrastructure::http::dto::{IdentityQuery, CACHE_KEY_HEADER};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// GET /<fragment-path>
///
/// 以完成标记为门控：未完成返回 404；命中返回分片字节，
/// `Last-Modified` 取完成标记时间
pub async fn get_fragment(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<IdentityQuery>,
) -> Response {
    let key = state.identity.resolve(&headers, &query);
    let cache_key = [(CACHE_KEY_HEADER, key.to_string())];
    // 对象 key 使用原始字符，请求路径需先解码
    let path = match urlencoding::decode(uri.path()) {
        Ok(path) => path.into_owned(),
        Err(_) => {
            return (
                cache_key,
                ApiError::NotFound(format!("Undecodable path={}", uri.path())),
            )
                .into_response()
        }
    };

    let result = state
        .get_fragment_handler
        .handle(GetFragmentQuery {
            key: key.clone(),
            path: path.clone(),
        })
        .await;

    match result {
        Ok(GetFragmentResponse::Found {
            fragment,
            last_modified,
            keep_alive,
        }) => (
            StatusCode::OK,
            cache_key,
            [
                (header::CONTENT_TYPE, content_type(&path).to_string()),
                (header::CONTENT_LENGTH, fragment.size.to_string()),
                (header::LAST_MODIFIED, http_date(&last_modified)),
            ],
            Body::from_stream(body_stream(fragment, keep_alive)),
        )
            .into_response(),
        Ok(GetFragmentResponse::NotDone) => (
            cache_key,
            ApiError::NotFound(format!("Transcoding not done key={}", key)),
        )
            .into_response(),
        Ok(GetFragmentResponse::NotFound) => (
            cache_key,
            ApiError::NotFound(format!("Content not found path={}", path)),
        )
            .into_response(),
        Err(e) => (
            cache_key,
            ApiError::Internal(format!("Failed to serve path={}: {}", path, e)),
        )
            .into_response(),
    }
}

/// 文件内容全部发出后兑现保活，读取出错或客户端断开则不保活
///
/// 带 Content-Length 时连接可能在最后一块之后不再轮询流，
/// 所以按已发送字节数判断完成
fn body_stream(
    fragment: CachedFragment,
    keep_alive: KeepAliveTicket,
) -> impl futures_util::Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    let size = fragment.size;
    let mut sent: u64 = 0;
    let mut ticket = Some(keep_alive);
    ReaderStream::new(fragment.file)
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .filter_map(move |item| {
            let finished = match &item {
                Some(Ok(chunk)) => {
                    sent += chunk.len() as u64;
                    sent >= size
                }
                Some(Err(_)) => {
                    ticket = None;
                    false
                }
                None => true,
            };
            if finished {
                if let Some(ticket) = ticket.take() {
                    ticket.redeem();
                }
            }
            future::ready(item)
        })
}

/// 按扩展名推断 Content-Type
fn content_type(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        "mp4" | "m4s" => "video/mp4",
        "vtt" => "text/vtt",
        "aac" => "audio/aac",
        _ => "application/octet-stream",
    }
}

/// RFC 7231 HTTP-date
pub(crate) fn http_date(t: &DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("/seg-1.ts"), "video/mp2t");
        assert_eq!(content_type("/index.m3u8"), "application/vnd.apple.mpegurl");
        assert_eq!(content_type("/sub.VTT"), "text/vtt");
        assert_eq!(content_type("/blob"), "application/octet-stream");
    }

    #[test]
    fn test_http_date() {
        let t = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(http_date(&t), "Sun, 06 Nov 1994 08:49:37 GMT");
    }
}
