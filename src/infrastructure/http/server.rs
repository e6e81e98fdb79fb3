//! HTTP Server
//!
//! Axum HTTP 服务器启动和配置

use std::path::PathBuf;
use std::sync::Arc;

use axum::middleware;
use axum::Router;
use http::header::{CONTENT_TYPE, RANGE};
use http::HeaderName;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::dto::{CACHE_KEY_HEADER, INFO_HASH_HEADER, KEY_PREFIX_HEADER, ORIGIN_PATH_HEADER};
use super::middleware::error_logging_middleware;
use super::routes::create_routes;
use super::state::AppState;

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 静态播放器目录，`None` 时不挂载 /player
    pub player_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            player_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            player_dir: None,
        }
    }

    pub fn with_player_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.player_dir = Some(dir.into());
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP 服务器
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 创建新的 HTTP 服务器
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// 构建 Router
    fn build_router(&self) -> Router {
        // 播放器可能与缓存不同源
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers([
                CONTENT_TYPE,
                RANGE,
                HeaderName::from_static(KEY_PREFIX_HEADER),
                HeaderName::from_static(INFO_HASH_HEADER),
                HeaderName::from_static(ORIGIN_PATH_HEADER),
            ])
            .expose_headers(Any)
            .max_age(std::time::Duration::from_secs(3600));

        create_routes(self.config.player_dir.clone())
            .layer(middleware::from_fn(error_logging_middleware))
            // 5xx 已由 error_logging_middleware 记录
            .layer(TraceLayer::new_for_http().on_failure(()))
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// 启动服务器（带优雅关闭）
    pub async fn run_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let addr = self.config.addr();

        info!(
            addr = %addr,
            player_dir = ?self.config.player_dir,
            cache_key_header = CACHE_KEY_HEADER,
            "Starting HTTP server (with graceful shutdown)"
        );

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        Ok(())
    }
}
