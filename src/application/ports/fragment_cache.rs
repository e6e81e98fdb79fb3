//! Fragment Cache Port - 分片内容缓存

use async_trait::async_trait;
use thiserror::Error;

use super::remote_store::StoreError;
use crate::domain::ContentKey;

/// 分片缓存错误
///
/// 需要 `Clone`：同一 key 的所有并发等待者共享同一个结果
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// 远端不存在该分片（不是故障）
    #[error("Content not found")]
    NotFound,

    #[error("Failed to resolve completion marker: {0}")]
    Completion(StoreError),

    #[error("Failed to fetch remote content: {0}")]
    Remote(StoreError),

    #[error("Content fetch timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(String),

    /// 后台拉取任务异常结束
    #[error("Fragment fetch aborted")]
    Aborted,
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

/// 已缓存在本地磁盘上的分片
#[derive(Debug)]
pub struct CachedFragment {
    pub file: tokio::fs::File,
    pub size: u64,
}

/// Fragment Cache Port
#[async_trait]
pub trait FragmentCachePort: Send + Sync {
    /// 获取分片，远端不存在时返回 `Ok(None)`
    async fn get(&self, key: &ContentKey, path: &str)
        -> Result<Option<CachedFragment>, CacheError>;

    /// 拉取并落盘，不返回内容
    async fn preload(&self, key: &ContentKey, path: &str) -> Result<(), CacheError>;
}
