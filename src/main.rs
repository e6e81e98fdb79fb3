//! Transcode Web Cache
//!
//! 从 S3 拉取转码分片，落地到本地磁盘后对外提供，并顺序预取后续分片

use std::sync::Arc;

use transcode_web_cache::config::{load_config, print_config, AppConfig};
use transcode_web_cache::infrastructure::adapters::{S3Storage, S3StorageConfig};
use transcode_web_cache::infrastructure::http::{
    AppState, HttpServer, IdentityResolver, ServerConfig,
};
use transcode_web_cache::infrastructure::memory::{DonePool, LazyMapConfig, TouchPool};
use transcode_web_cache::infrastructure::persistence::{DiskCacheConfig, DiskContentCache};
use transcode_web_cache::infrastructure::worker::{LookaheadCache, LookaheadConfig};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},transcode_web_cache={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        return;
    }
    tracing::info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Transcode Web Cache");
    print_config(&config);

    // 远端存储
    let store = Arc::new(S3Storage::new(S3StorageConfig {
        bucket: config.s3.bucket.clone(),
        region: config.s3.region.clone(),
        endpoint: config.s3.endpoint.clone(),
        access_key_id: config.s3.access_key_id.clone(),
        secret_access_key: config.s3.secret_access_key.clone(),
        allow_http: config.s3.allow_http,
        timeout_secs: config.s3.timeout_secs,
    })?);

    // 完成标记缓存与保活去抖
    let completion = DonePool::with_ttl(
        store.clone(),
        std::time::Duration::from_secs(config.done.ttl_secs),
    )
    .arc();
    let keep_alive = TouchPool::with_ttl(
        store.clone(),
        std::time::Duration::from_secs(config.touch.ttl_secs),
    )
    .arc();

    // 磁盘缓存（启动时创建目录）
    let lazy = LazyMapConfig {
        concurrency: config.cache.concurrency,
        expire: config.cache.expire(),
        error_expire: config.cache.error_expire(),
        capacity: config.cache.capacity,
    };
    let disk = DiskContentCache::new(
        DiskCacheConfig {
            dir: config.cache.dir.clone(),
            invalidate_on_marker: config.cache.invalidate_on_marker,
            fetch_timeout: config.cache.fetch_timeout(),
            lazy: lazy.clone(),
        },
        store.clone(),
        completion.clone(),
    )
    .await?
    .arc();

    // 顺序预取
    let cache = LookaheadCache::new(
        LookaheadConfig {
            count: config.lookahead.count,
            concurrency: config.lookahead.concurrency,
            lazy,
        },
        disk,
    )
    .arc();

    let identity = IdentityResolver::new(
        config.identity.key_prefix.clone(),
        config.identity.info_hash.clone(),
        config.identity.origin_path.clone(),
        config.identity.default_key_prefix.clone(),
    );
    let state = AppState::new(identity, completion, cache, keep_alive);

    let mut server_config = ServerConfig::new(&config.server.host, config.server.port);
    if config.player.enabled {
        server_config = server_config.with_player_dir(config.player.dir.clone());
    }

    let server = HttpServer::new(server_config, state);

    server.run_with_shutdown(shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
