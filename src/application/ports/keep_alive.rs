//! Keep-Alive Port - "仍在使用" 信号

use async_trait::async_trait;

use super::remote_store::StoreError;
use crate::domain::ContentKey;

/// Keep-Alive Port
///
/// 同一内容标识在去抖窗口内最多触发一次远端写入
#[async_trait]
pub trait KeepAlivePort: Send + Sync {
    async fn touch(&self, key: &ContentKey) -> Result<(), StoreError>;
}
