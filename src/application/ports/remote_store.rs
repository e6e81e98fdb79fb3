//! Remote Store Port - 远端对象存储
//!
//! 对象 key 布局：
//! - 分片内容: `<key><path>`
//! - 完成标记: `done/<key>`
//! - 保活标记: `touch/<key>`（内容为当前 Unix 时间戳的十进制文本）

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::domain::ContentKey;

/// 远端存储错误
///
/// 对象不存在不是错误，由各方法以 `None` / `DoneMarker::absent()` 表示
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Remote request failed: {0}")]
    Request(String),

    #[error("Remote request timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// 分片内容字节流
pub type ContentStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// 完成标记状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoneMarker {
    /// 标记的最后修改时间，`None` 表示标记不存在
    pub last_modified: Option<DateTime<Utc>>,
}

impl DoneMarker {
    pub fn absent() -> Self {
        Self {
            last_modified: None,
        }
    }

    pub fn at(last_modified: DateTime<Utc>) -> Self {
        Self {
            last_modified: Some(last_modified),
        }
    }

    pub fn is_done(&self) -> bool {
        self.last_modified.is_some()
    }
}

/// Remote Store Port
#[async_trait]
pub trait RemoteStorePort: Send + Sync {
    /// 获取分片内容，不存在时返回 `None`
    async fn get_content(
        &self,
        key: &ContentKey,
        path: &str,
    ) -> Result<Option<ContentStream>, StoreError>;

    /// 检查完成标记
    async fn check_done_marker(&self, key: &ContentKey) -> Result<DoneMarker, StoreError>;

    /// 写入保活标记
    async fn touch(&self, key: &ContentKey) -> Result<(), StoreError>;
}
