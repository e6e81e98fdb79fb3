//! Fragment Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    CompletionTrackerPort, DoneMarker, FragmentCachePort, KeepAlivePort,
};
use crate::application::queries::fragment_queries::{
    CheckDoneQuery, GetFragmentQuery, GetFragmentResponse,
};
use crate::domain::ContentKey;

/// CheckDone Handler - 查询完成标记
pub struct CheckDoneHandler {
    completion: Arc<dyn CompletionTrackerPort>,
}

impl CheckDoneHandler {
    pub fn new(completion: Arc<dyn CompletionTrackerPort>) -> Self {
        Self { completion }
    }

    pub async fn handle(&self, query: CheckDoneQuery) -> Result<DoneMarker, ApplicationError> {
        Ok(self.completion.done(&query.key).await?)
    }
}

/// 分片发送完成后的保活凭据
///
/// 只有 `redeem` 才会触发保活，客户端中途断开时直接丢弃
pub struct KeepAliveTicket {
    keep_alive: Arc<dyn KeepAlivePort>,
    key: ContentKey,
}

impl KeepAliveTicket {
    /// 后台执行保活，错误只记录日志
    pub fn redeem(self) {
        let Self { keep_alive, key } = self;
        tokio::spawn(async move {
            if let Err(e) = keep_alive.touch(&key).await {
                tracing::error!(key = %key, error = %e, "Failed to touch");
            }
        });
    }
}

impl std::fmt::Debug for KeepAliveTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepAliveTicket")
            .field("key", &self.key)
            .finish()
    }
}

/// GetFragment Handler - 获取分片
///
/// 流程：完成标记检查（门控）→ 分片缓存 → 发送完毕后保活
pub struct GetFragmentHandler {
    completion: Arc<dyn CompletionTrackerPort>,
    cache: Arc<dyn FragmentCachePort>,
    keep_alive: Arc<dyn KeepAlivePort>,
}

impl GetFragmentHandler {
    pub fn new(
        completion: Arc<dyn CompletionTrackerPort>,
        cache: Arc<dyn FragmentCachePort>,
        keep_alive: Arc<dyn KeepAlivePort>,
    ) -> Self {
        Self {
            completion,
            cache,
            keep_alive,
        }
    }

    pub async fn handle(
        &self,
        query: GetFragmentQuery,
    ) -> Result<GetFragmentResponse, ApplicationError> {
        let marker = self.completion.done(&query.key).await?;
        let last_modified = match marker.last_modified {
            Some(t) => t,
            None => return Ok(GetFragmentResponse::NotDone),
        };

        let fragment = match self.cache.get(&query.key, &query.path).await? {
            Some(f) => f,
            None => return Ok(GetFragmentResponse::NotFound),
        };

        Ok(GetFragmentResponse::Found {
            fragment,
            last_modified,
            keep_alive: KeepAliveTicket {
                keep_alive: self.keep_alive.clone(),
                key: query.key,
            },
        })
    }
}
