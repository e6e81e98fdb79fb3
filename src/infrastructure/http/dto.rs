//! Data Transfer Objects
//!
//! 请求身份解析：配置覆盖 > 请求头 > 查询参数 > 默认值

use axum::http::HeaderMap;
use serde::Deserialize;

use crate::domain::ContentKey;

pub const KEY_PREFIX_HEADER: &str = "x-key-prefix";
pub const INFO_HASH_HEADER: &str = "x-info-hash";
pub const ORIGIN_PATH_HEADER: &str = "x-origin-path";
pub const CACHE_KEY_HEADER: &str = "x-cache-key";

/// 默认 key prefix
pub const DEFAULT_KEY_PREFIX: &str = "transcoder";

/// 身份相关的查询参数
#[derive(Debug, Default, Deserialize)]
pub struct IdentityQuery {
    #[serde(rename = "key-prefix")]
    pub key_prefix: Option<String>,
    #[serde(rename = "info-hash")]
    pub info_hash: Option<String>,
    #[serde(rename = "origin-path")]
    pub origin_path: Option<String>,
}

/// 请求身份解析器
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    key_prefix: Option<String>,
    info_hash: Option<String>,
    origin_path: Option<String>,
    default_key_prefix: String,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self {
            key_prefix: None,
            info_hash: None,
            origin_path: None,
            default_key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl IdentityResolver {
    /// 创建解析器，空字符串视为未设置
    pub fn new(
        key_prefix: Option<String>,
        info_hash: Option<String>,
        origin_path: Option<String>,
        default_key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            key_prefix: non_empty(key_prefix),
            info_hash: non_empty(info_hash),
            origin_path: non_empty(origin_path),
            default_key_prefix: default_key_prefix.into(),
        }
    }

    /// 解析请求对应的内容标识
    pub fn resolve(&self, headers: &HeaderMap, query: &IdentityQuery) -> ContentKey {
        let key_prefix = pick(&self.key_prefix, headers, KEY_PREFIX_HEADER, &query.key_prefix)
            .unwrap_or_else(|| self.default_key_prefix.clone());
        let info_hash =
            pick(&self.info_hash, headers, INFO_HASH_HEADER, &query.info_hash).unwrap_or_default();
        let origin_path = pick(
            &self.origin_path,
            headers,
            ORIGIN_PATH_HEADER,
            &query.origin_path,
        )
        .unwrap_or_default();

        ContentKey::new(&key_prefix, &info_hash, &origin_path)
    }
}

fn pick(
    configured: &Option<String>,
    headers: &HeaderMap,
    header: &str,
    query: &Option<String>,
) -> Option<String> {
    configured
        .clone()
        .or_else(|| {
            headers
                .get(header)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .or_else(|| query.clone().filter(|v| !v.is_empty()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
