//! HTTP Routes
//!
//! Endpoints:
//! - /ping              GET  存活检查
//! - /done              GET  完成标记查询（200 / 404 / 500）
//! - /player/*          GET  静态播放器（可选）
//! - 其它任意路径        GET  分片内容（以完成标记为门控），其它方法 405
//!
//! 内容标识来自 `X-Key-Prefix` / `X-Info-Hash` / `X-Origin-Path` 请求头，
//! 或同名 query 参数（`key-prefix` / `info-hash` / `origin-path`）

use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes(player_dir: Option<PathBuf>) -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/ping", get(handlers::ping))
        .route("/done", get(handlers::check_done));

    let router = match player_dir {
        Some(dir) => router.nest_service("/player", ServeDir::new(dir)),
        None => router,
    };

    router.fallback(get(handlers::get_fragment))
}
