//! DonePool - 完成标记缓存（Completion Tracker）
//!
//! 每个内容标识一个惰性创建的 DoneFetcher：
//! - 首次调用访问远端，结果（包括错误）在 TTL 内被缓存
//! - 创建时启动延迟任务，TTL 到期后删除条目，下一次调用重新访问远端

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::application::ports::{CompletionTrackerPort, DoneMarker, RemoteStorePort, StoreError};
use crate::domain::ContentKey;

/// 默认 TTL: 600 秒
pub const DEFAULT_DONE_TTL: Duration = Duration::from_secs(600);

/// 单个内容标识的完成标记获取器
///
/// 持有独占锁：并发调用者等待同一次远端检查
struct DoneFetcher {
    created_at: Instant,
    result: Mutex<Option<Result<DoneMarker, StoreError>>>,
}

impl DoneFetcher {
    fn new() -> Self {
        Self {
            created_at: Instant::now(),
            result: Mutex::new(None),
        }
    }

    async fn fetch(
        &self,
        store: &dyn RemoteStorePort,
        key: &ContentKey,
    ) -> Result<DoneMarker, StoreError> {
        let mut result = self.result.lock().await;
        if let Some(r) = result.as_ref() {
            return r.clone();
        }
        let r = store.check_done_marker(key).await;
        if let Err(e) = &r {
            tracing::warn!(key = %key, error = %e, "Done marker check failed");
        }
        *result = Some(r.clone());
        r
    }
}

/// 完成标记缓存
pub struct DonePool {
    fetchers: Arc<DashMap<String, Arc<DoneFetcher>>>,
    store: Arc<dyn RemoteStorePort>,
    ttl: Duration,
}

impl DonePool {
    pub fn new(store: Arc<dyn RemoteStorePort>) -> Self {
        Self::with_ttl(store, DEFAULT_DONE_TTL)
    }

    pub fn with_ttl(store: Arc<dyn RemoteStorePort>, ttl: Duration) -> Self {
        Self {
            fetchers: Arc::new(DashMap::new()),
            store,
            ttl,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 查询完成标记
    pub async fn done(&self, key: &ContentKey) -> Result<DoneMarker, StoreError> {
        let fetcher = self.fetcher(key);
        fetcher.fetch(self.store.as_ref(), key).await
    }

    fn fetcher(&self, key: &ContentKey) -> Arc<DoneFetcher> {
        let fetcher = match self.fetchers.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().created_at.elapsed() < self.ttl {
                    return occupied.get().clone();
                }
                // 删除任务尚未运行
                let fetcher = Arc::new(DoneFetcher::new());
                occupied.insert(fetcher.clone());
                fetcher
            }
            Entry::Vacant(vacant) => vacant.insert(Arc::new(DoneFetcher::new())).clone(),
        };

        self.schedule_removal(key.to_string(), fetcher.clone());
        fetcher
    }

    fn schedule_removal(&self, key: String, fetcher: Arc<DoneFetcher>) {
        let fetchers = self.fetchers.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            fetchers.remove_if(&key, |_, current| Arc::ptr_eq(current, &fetcher));
        });
    }
}

#[async_trait]
impl CompletionTrackerPort for DonePool {
    async fn done(&self, key: &ContentKey) -> Result<DoneMarker, StoreError> {
        DonePool::done(self, key).await
    }
}
