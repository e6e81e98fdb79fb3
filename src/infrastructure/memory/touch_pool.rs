//! TouchPool - 保活信号去抖（Keep-Alive Debouncer）
//!
//! 同一内容标识在 TTL 窗口内只向远端写一次 `touch/<key>`

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::application::ports::{KeepAlivePort, RemoteStorePort, StoreError};
use crate::domain::ContentKey;

/// 默认去抖窗口: 60 秒
pub const DEFAULT_TOUCH_TTL: Duration = Duration::from_secs(60);

pub struct TouchPool {
    /// key -> 写入时间
    touched: Arc<DashMap<String, Instant>>,
    store: Arc<dyn RemoteStorePort>,
    ttl: Duration,
}

impl TouchPool {
    pub fn new(store: Arc<dyn RemoteStorePort>) -> Self {
        Self::with_ttl(store, DEFAULT_TOUCH_TTL)
    }

    pub fn with_ttl(store: Arc<dyn RemoteStorePort>, ttl: Duration) -> Self {
        Self {
            touched: Arc::new(DashMap::new()),
            store,
            ttl,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 发送保活信号
    ///
    /// 只有真正触发远端写入的调用者会看到写入错误
    pub async fn touch(&self, key: &ContentKey) -> Result<(), StoreError> {
        let now = Instant::now();
        match self.touched.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if now.duration_since(*occupied.get()) < self.ttl {
                    return Ok(());
                }
                occupied.insert(now);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
            }
        }

        self.schedule_removal(key.to_string(), now);
        self.store.touch(key).await
    }

    fn schedule_removal(&self, key: String, touched_at: Instant) {
        let touched = self.touched.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            touched.remove_if(&key, |_, at| *at == touched_at);
        });
    }
}

#[async_trait]
impl KeepAlivePort for TouchPool {
    async fn touch(&self, key: &ContentKey) -> Result<(), StoreError> {
        TouchPool::touch(self, key).await
    }
}
