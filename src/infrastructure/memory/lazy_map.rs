//! LazyMap - 带 TTL 和容量上限的异步记忆化缓存
//!
//! - 同一 key 的并发调用只执行一次 compute，所有调用者共享同一结果（single-flight）
//! - 成功结果在 `expire` 后过期，错误结果在（更短的）`error_expire` 后过期
//! - 条目总数受 `capacity` 限制：先清理过期条目，仍然满时淘汰最久未访问的已完成条目
//! - 同时执行的 compute 数量受 `concurrency` 限制
//!
//! 过期为惰性检查：访问时发现过期才替换。
//!
//! compute 在独立的 tokio 任务中运行，调用者只等待共享的结果句柄：
//! 任何一个调用者被取消都不会中断或重复这次计算。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// LazyMap 配置
#[derive(Debug, Clone)]
pub struct LazyMapConfig {
    /// 最大并发 compute 数
    pub concurrency: usize,
    /// 成功结果有效期
    pub expire: Duration,
    /// 错误结果有效期
    pub error_expire: Duration,
    /// 最大条目数
    pub capacity: usize,
}

impl Default for LazyMapConfig {
    fn default() -> Self {
        Self {
            concurrency: 100,
            expire: Duration::from_secs(60),
            error_expire: Duration::from_secs(30),
            capacity: 1000,
        }
    }
}

/// compute 所在任务没有产出结果（panic 或运行时关闭）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Memoized computation aborted")]
pub struct ComputeAborted;

#[derive(Clone)]
struct Outcome<V, E> {
    result: Result<V, E>,
    stored_at: Instant,
}

/// 计算任务的共享句柄，`None` 表示任务异常结束
type SharedOutcome<V, E> = Shared<BoxFuture<'static, Option<Outcome<V, E>>>>;

struct LazyEntry<V, E> {
    task: OnceLock<SharedOutcome<V, E>>,
    /// 最近访问时间（相对 map 创建时刻的毫秒数）
    last_access: AtomicU64,
}

impl<V, E> LazyEntry<V, E>
where
    V: Clone,
    E: Clone,
{
    fn new(tick: u64) -> Self {
        Self {
            task: OnceLock::new(),
            last_access: AtomicU64::new(tick),
        }
    }

    fn touch(&self, tick: u64) {
        self.last_access.store(tick, Ordering::Relaxed);
    }

    /// 已完成的结果；计算中返回 `None`
    fn finished(&self) -> Option<&Option<Outcome<V, E>>> {
        self.task.get().and_then(|task| task.peek())
    }
}

/// 记忆化异步缓存
pub struct LazyMap<V, E> {
    entries: DashMap<String, Arc<LazyEntry<V, E>>>,
    config: LazyMapConfig,
    permits: Arc<Semaphore>,
    epoch: Instant,
}

impl<V, E> LazyMap<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<ComputeAborted> + 'static,
{
    pub fn new(config: LazyMapConfig) -> Self {
        Self {
            entries: DashMap::new(),
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
            config,
            epoch: Instant::now(),
        }
    }

    /// 获取 key 对应的结果，必要时执行 compute
    ///
    /// 未过期的结果（无论成功或失败）直接返回，不会调用 compute。
    pub async fn get<F, Fut>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let entry = self.entry(key);

        let task = entry
            .task
            .get_or_init(|| self.spawn(compute()))
            .clone();

        match task.await {
            Some(outcome) => outcome.result,
            None => {
                tracing::error!(key = %key, "LazyMap computation aborted");
                Err(ComputeAborted.into())
            }
        }
    }

    /// 当前驻留条目数（包括尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn spawn<Fut>(&self, fut: Fut) -> SharedOutcome<V, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let permits = self.permits.clone();
        let handle = tokio::spawn(async move {
            // 信号量从不关闭
            let _permit = permits.acquire_owned().await.ok();
            let result = fut.await;
            Outcome {
                result,
                stored_at: Instant::now(),
            }
        });

        handle.map(|joined| joined.ok()).boxed().shared()
    }

    /// 取得可用条目：不存在或已过期时创建新条目
    fn entry(&self, key: &str) -> Arc<LazyEntry<V, E>> {
        let now = Instant::now();
        let tick = self.tick(now);

        let live = self
            .entries
            .get(key)
            .filter(|e| !self.is_expired(e, now))
            .map(|e| e.clone());
        if let Some(entry) = live {
            entry.touch(tick);
            return entry;
        }

        if !self.entries.contains_key(key) && self.entries.len() >= self.config.capacity {
            self.evict(now);
        }

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if self.is_expired(occupied.get(), now) {
                    occupied.insert(Arc::new(LazyEntry::new(tick)));
                }
                let entry = occupied.get().clone();
                entry.touch(tick);
                entry
            }
            Entry::Vacant(vacant) => vacant.insert(Arc::new(LazyEntry::new(tick))).clone(),
        }
    }

    fn is_expired(&self, entry: &LazyEntry<V, E>, now: Instant) -> bool {
        match entry.finished() {
            // 计算中的条目不会过期
            None => false,
            // 异常结束的条目立即可重试
            Some(None) => true,
            Some(Some(outcome)) => {
                let ttl = match outcome.result {
                    Ok(_) => self.config.expire,
                    Err(_) => self.config.error_expire,
                };
                now.duration_since(outcome.stored_at) >= ttl
            }
        }
    }

    /// 腾出至少一个位置
    fn evict(&self, now: Instant) {
        self.entries.retain(|_, e| !self.is_expired(e, now));
        if self.entries.len() < self.config.capacity {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .filter(|e| e.value().finished().is_some())
            .min_by_key(|e| e.value().last_access.load(Ordering::Relaxed))
            .map(|e| (e.key().clone(), e.value().clone()));

        if let Some((key, victim)) = oldest {
            self.entries
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &victim));
            tracing::debug!(key = %key, "LazyMap evicted least recently used entry");
        }
    }

    fn tick(&self, now: Instant) -> u64 {
        now.duration_since(self.epoch).as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Boom,
        Aborted,
    }

    impl From<ComputeAborted> for TestError {
        fn from(_: ComputeAborted) -> Self {
            TestError::Aborted
        }
    }

    fn config(expire: u64, error_expire: u64, capacity: usize) -> LazyMapConfig {
        LazyMapConfig {
            concurrency: 10,
            expire: Duration::from_secs(expire),
            error_expire: Duration::from_secs(error_expire),
            capacity,
        }
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_compute_once() {
        let map: LazyMap<u32, TestError> = LazyMap::new(config(60, 30, 100));
        let calls = counter();

        let results = join_all((0..50).map(|_| {
            let calls = calls.clone();
            map.get("k", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(42)
            })
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r == &Ok(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_caller_does_not_restart_compute() {
        let map: Arc<LazyMap<u32, TestError>> = Arc::new(LazyMap::new(config(60, 30, 100)));
        let calls = counter();

        let compute = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(7)
            }
        };

        let first = {
            let map = map.clone();
            let compute = compute(calls.clone());
            tokio::spawn(async move { map.get("k", compute).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = {
            let map = map.clone();
            let compute = compute(calls.clone());
            tokio::spawn(async move { map.get("k", compute).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // 第一个调用者中途离开
        first.abort();

        assert_eq!(second.await.unwrap(), Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compute_finishes_after_all_callers_leave() {
        let map: Arc<LazyMap<u32, TestError>> = Arc::new(LazyMap::new(config(60, 30, 100)));
        let calls = counter();
        let finished = counter();

        let caller = {
            let map = map.clone();
            let calls = calls.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                map.get("k", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        caller.abort();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        // 结果已缓存，不会再计算
        let again = map.get("k", || async { Ok(2) }).await;
        assert_eq!(again, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_expires_after_ttl() {
        let map: LazyMap<u32, TestError> = LazyMap::new(config(60, 30, 100));
        let calls = counter();
        let compute = || {
            let n = calls.fetch_add(1, Ordering::SeqCst) as u32;
            async move { Ok(n) }
        };

        assert_eq!(map.get("k", compute).await, Ok(0));
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(map.get("k", compute).await, Ok(0));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(map.get("k", compute).await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_is_cached_for_error_ttl() {
        let map: LazyMap<u32, TestError> = LazyMap::new(config(60, 30, 100));
        let calls = counter();
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>(TestError::Boom) }
        };

        assert_eq!(map.get("k", compute).await, Err(TestError::Boom));
        assert!(map.get("k", compute).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(map.get("k", compute).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_compute_is_retried() {
        let map: LazyMap<u32, TestError> = LazyMap::new(config(60, 30, 100));

        let result = map
            .get("k", || async {
                if true {
                    panic!("compute failed");
                }
                Ok(0)
            })
            .await;
        assert_eq!(result, Err(TestError::Aborted));

        assert_eq!(map.get("k", || async { Ok(3) }).await, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_least_recently_used() {
        let map: LazyMap<&'static str, TestError> = LazyMap::new(config(600, 600, 2));

        map.get("a", || async { Ok("a") }).await.unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        map.get("b", || async { Ok("b") }).await.unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        // 再次访问 a，使 b 成为最久未访问
        map.get("a", || async { Ok("unused") }).await.unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        map.get("c", || async { Ok("c") }).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a", || async { Ok("recomputed") }).await, Ok("a"));
        assert_eq!(
            map.get("b", || async { Ok("recomputed") }).await,
            Ok("recomputed")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit() {
        let map: LazyMap<usize, TestError> = LazyMap::new(LazyMapConfig {
            concurrency: 2,
            ..LazyMapConfig::default()
        });
        let running = counter();
        let peak = counter();

        let keys: Vec<String> = (0..8).map(|i| format!("k{}", i)).collect();
        join_all(keys.iter().map(|k| {
            let running = running.clone();
            let peak = peak.clone();
            map.get(k, move || async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(now)
            })
        }))
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }
}
