//! Lookahead Cache - 顺序分片预取
//!
//! 实现 FragmentCachePort trait，包装磁盘缓存：
//! 每次访问 `<prefix>-N<suffix>` 时，在后台把 N+1 ..= N+count 预先拉到本地。
//!
//! 每个 (内容标识, prefix, suffix) 对应一个 TaskQueue，由 LazyMap 管理生命周期，
//! 队列内 worker 数固定。预取是尽力而为：失败只记日志，不影响前台请求。

use async_trait::async_trait;
use std::sync::Arc;

use super::queue::TaskQueue;
use crate::application::ports::{CacheError, CachedFragment, FragmentCachePort};
use crate::domain::{ContentKey, Fragment};
use crate::infrastructure::memory::{ComputeAborted, LazyMap, LazyMapConfig};

/// 预取配置
#[derive(Debug, Clone)]
pub struct LookaheadConfig {
    /// 预取的后续分片数
    pub count: u64,
    /// 每个序列队列的 worker 数
    pub concurrency: usize,
    /// 队列注册表的 LazyMap 配置
    pub lazy: LazyMapConfig,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self {
            count: 10,
            concurrency: 3,
            lazy: LazyMapConfig::default(),
        }
    }
}

/// 带顺序预取的分片缓存
#[derive(Clone)]
pub struct LookaheadCache {
    cache: Arc<dyn FragmentCachePort>,
    queues: Arc<LazyMap<Arc<TaskQueue>, ComputeAborted>>,
    count: u64,
    concurrency: usize,
}

impl LookaheadCache {
    pub fn new(config: LookaheadConfig, cache: Arc<dyn FragmentCachePort>) -> Self {
        Self {
            cache,
            queues: Arc::new(LazyMap::new(config.lazy)),
            count: config.count,
            concurrency: config.concurrency,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 为 `path` 之后的分片安排预取
    ///
    /// 非顺序分片路径（如播放列表）直接忽略
    pub async fn prefetch(&self, key: &ContentKey, path: &str) {
        let Some(fragment) = Fragment::parse(path) else {
            return;
        };

        let queue = match self.queue(key, &fragment).await {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(key = %key, path = %path, error = %e, "Prefetch queue unavailable");
                return;
            }
        };

        for offset in 1..=self.count {
            // 序号已到上限，后面不会再有分片
            let Some(next) = fragment.inc(offset) else {
                break;
            };
            let next = next.to_string();
            let cache = self.cache.clone();
            let queue = queue.clone();
            let key = key.clone();

            tokio::spawn(async move {
                queue
                    .push(Box::pin(async move {
                        match cache.preload(&key, &next).await {
                            Ok(()) => {}
                            // 序列末尾之后的分片本来就不存在
                            Err(CacheError::NotFound) => {
                                tracing::debug!(key = %key, path = %next, "Prefetch target not found");
                            }
                            Err(e) => {
                                tracing::warn!(key = %key, path = %next, error = %e, "Prefetch failed");
                            }
                        }
                    }))
                    .await;
            });
        }
    }

    async fn queue(
        &self,
        key: &ContentKey,
        fragment: &Fragment,
    ) -> Result<Arc<TaskQueue>, ComputeAborted> {
        let queue_key = format!("{}{}{}", key, fragment.prefix(), fragment.suffix());
        let concurrency = self.concurrency;
        let queue = self
            .queues
            .get(&queue_key, || async move {
                Ok(Arc::new(TaskQueue::new(concurrency)))
            })
            .await;

        queue
    }

    /// 当前驻留的序列队列数
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }
}

#[async_trait]
impl FragmentCachePort for LookaheadCache {
    /// 后台触发预取，然后与底层缓存的 get 行为一致
    async fn get(
        &self,
        key: &ContentKey,
        path: &str,
    ) -> Result<Option<CachedFragment>, CacheError> {
        let this = self.clone();
        let prefetch_key = key.clone();
        let prefetch_path = path.to_string();
        tokio::spawn(async move {
            this.prefetch(&prefetch_key, &prefetch_path).await;
        });

        self.cache.get(key, path).await
    }

    async fn preload(&self, key: &ContentKey, path: &str) -> Result<(), CacheError> {
        self.cache.preload(key, path).await
    }
}
