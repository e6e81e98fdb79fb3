//! Content Identity - 内容标识
//!
//! 由 (prefix, info_hash, origin_path) 按顺序拼接后做 SHA1 得到的指纹，
//! 同时也是远端对象存储的 key 前缀（`<key><path>`、`done/<key>`、`touch/<key>`）。

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};

/// 内容标识（40 位十六进制 SHA1）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(String);

impl ContentKey {
    /// 由三个逻辑字段计算内容标识
    pub fn new(prefix: &str, info_hash: &str, origin_path: &str) -> Self {
        Self(sha1_hex(&[prefix, info_hash, origin_path]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 计算本地缓存条目 key
    ///
    /// `marker` 为完成标记的最后修改时间；标记被重新写入后 key 随之改变，
    /// 旧条目自然不可达。
    pub fn cache_entry_key(&self, path: &str, marker: Option<&DateTime<Utc>>) -> String {
        let stamp = marker.map(|t| t.to_rfc3339()).unwrap_or_default();
        sha1_hex(&[&self.0, path, &stamp])
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ContentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn sha1_hex(parts: &[&str]) -> String {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}
