//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 内容标识覆盖
    #[serde(default)]
    pub identity: IdentityConfig,

    /// 静态播放器
    #[serde(default)]
    pub player: PlayerConfig,

    /// S3 远端存储
    #[serde(default)]
    pub s3: S3Config,

    /// 磁盘分片缓存
    #[serde(default)]
    pub cache: CacheConfig,

    /// 完成标记缓存
    #[serde(default)]
    pub done: DoneConfig,

    /// 保活去抖
    #[serde(default)]
    pub touch: TouchConfig,

    /// 顺序预取
    #[serde(default)]
    pub lookahead: LookaheadConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 内容标识配置
///
/// 设置后优先于请求头和查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub key_prefix: Option<String>,

    #[serde(default)]
    pub info_hash: Option<String>,

    #[serde(default)]
    pub origin_path: Option<String>,

    /// 请求未携带 key prefix 时的默认值
    #[serde(default = "default_key_prefix")]
    pub default_key_prefix: String,
}

fn default_key_prefix() -> String {
    "transcoder".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            key_prefix: None,
            info_hash: None,
            origin_path: None,
            default_key_prefix: default_key_prefix(),
        }
    }
}

/// 静态播放器配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_player_dir")]
    pub dir: PathBuf,
}

fn default_player_dir() -> PathBuf {
    PathBuf::from("./player")
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_player_dir(),
        }
    }
}

/// S3 配置
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    #[serde(default)]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// 自定义 endpoint（S3 兼容服务）
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default)]
    pub allow_http: bool,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_s3_timeout")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_s3_timeout() -> u64 {
    60
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
            timeout_secs: default_s3_timeout(),
        }
    }
}

/// 磁盘分片缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 缓存目录
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// 缓存 key 是否包含完成标记时间（重新转码后自动失效）
    #[serde(default = "default_true")]
    pub invalidate_on_marker: bool,

    /// 单个分片下载超时（秒）
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// 预载结果有效期（秒）
    #[serde(default = "default_expire")]
    pub expire_secs: u64,

    /// 预载失败结果有效期（秒）
    #[serde(default = "default_error_expire")]
    pub error_expire_secs: u64,

    /// 驻留条目上限
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// 同时进行的预载数上限
    #[serde(default = "default_cache_concurrency")]
    pub concurrency: usize,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_expire() -> u64 {
    60
}

fn default_error_expire() -> u64 {
    30
}

fn default_capacity() -> usize {
    1000
}

fn default_cache_concurrency() -> usize {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            invalidate_on_marker: true,
            fetch_timeout_secs: default_fetch_timeout(),
            expire_secs: default_expire(),
            error_expire_secs: default_error_expire(),
            capacity: default_capacity(),
            concurrency: default_cache_concurrency(),
        }
    }
}

impl CacheConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn expire(&self) -> Duration {
        Duration::from_secs(self.expire_secs)
    }

    pub fn error_expire(&self) -> Duration {
        Duration::from_secs(self.error_expire_secs)
    }
}

/// 完成标记缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct DoneConfig {
    #[serde(default = "default_done_ttl")]
    pub ttl_secs: u64,
}

fn default_done_ttl() -> u64 {
    600 // 10 分钟
}

impl Default for DoneConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_done_ttl(),
        }
    }
}

/// 保活去抖配置
#[derive(Debug, Clone, Deserialize)]
pub struct TouchConfig {
    #[serde(default = "default_touch_ttl")]
    pub ttl_secs: u64,
}

fn default_touch_ttl() -> u64 {
    60
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_touch_ttl(),
        }
    }
}

/// 顺序预取配置
#[derive(Debug, Clone, Deserialize)]
pub struct LookaheadConfig {
    /// 预取的后续分片数
    #[serde(default = "default_lookahead_count")]
    pub count: u64,

    /// 每个序列的 worker 数
    #[serde(default = "default_lookahead_concurrency")]
    pub concurrency: usize,
}

fn default_lookahead_count() -> u64 {
    10
}

fn default_lookahead_concurrency() -> usize {
    3
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self {
            count: default_lookahead_count(),
            concurrency: default_lookahead_concurrency(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
