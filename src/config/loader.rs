//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "TWC";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `TWC_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `TWC_SERVER__PORT=8080`
/// - `TWC_S3__BUCKET=media`
/// - `TWC_S3__ENDPOINT=http://minio:9000`
/// - `TWC_CACHE__DIR=/var/cache/twc`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("identity.default_key_prefix", "transcoder")?
        .set_default("s3.region", "us-east-1")?
        .set_default("s3.timeout_secs", 60)?
        .set_default("cache.dir", "cache")?
        .set_default("cache.invalidate_on_marker", true)?
        .set_default("done.ttl_secs", 600)?
        .set_default("touch.ttl_secs", 60)?
        .set_default("lookahead.count", 10)?
        .set_default("lookahead.concurrency", 3)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: TWC_S3__BUCKET=media
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    fn invalid(msg: &str) -> Result<(), ConfigError> {
        Err(ConfigError::ValidationError(msg.to_string()))
    }

    if config.server.port == 0 {
        return invalid("Server port cannot be 0");
    }

    if config.s3.bucket.is_empty() {
        return invalid("S3 bucket cannot be empty");
    }

    if config.cache.dir.as_os_str().is_empty() {
        return invalid("Cache directory cannot be empty");
    }

    if config.cache.expire_secs == 0 || config.cache.error_expire_secs == 0 {
        return invalid("Cache expiry cannot be 0");
    }

    if config.cache.capacity == 0 || config.cache.concurrency == 0 {
        return invalid("Cache capacity and concurrency cannot be 0");
    }

    if config.done.ttl_secs == 0 || config.touch.ttl_secs == 0 {
        return invalid("Done and touch TTL cannot be 0");
    }

    if config.lookahead.concurrency == 0 {
        return invalid("Lookahead concurrency cannot be 0");
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!(
        "S3: bucket={} region={} endpoint={:?}",
        config.s3.bucket,
        config.s3.region,
        config.s3.endpoint
    );
    tracing::info!("Cache Directory: {:?}", config.cache.dir);
    tracing::info!("Invalidate On Marker: {}", config.cache.invalidate_on_marker);
    tracing::info!(
        "Cache Expire: {}s (errors {}s), capacity {}",
        config.cache.expire_secs,
        config.cache.error_expire_secs,
        config.cache.capacity
    );
    tracing::info!("Done TTL: {}s", config.done.ttl_secs);
    tracing::info!("Touch TTL: {}s", config.touch.ttl_secs);
    tracing::info!(
        "Lookahead: {} fragments, {} workers",
        config.lookahead.count,
        config.lookahead.concurrency
    );
    if config.player.enabled {
        tracing::info!("Player Directory: {:?}", config.player.dir);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
