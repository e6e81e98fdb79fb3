//! Completion Tracker Port - 转码完成状态

use async_trait::async_trait;

use super::remote_store::{DoneMarker, StoreError};
use crate::domain::ContentKey;

/// Completion Tracker Port
///
/// 结果（包括错误）在固定窗口内被缓存，窗口内重复调用不会访问远端
#[async_trait]
pub trait CompletionTrackerPort: Send + Sync {
    async fn done(&self, key: &ContentKey) -> Result<DoneMarker, StoreError>;
}
