//! Fake Remote Store - 内存实现的远端存储（测试用）
//!
//! 记录每类远端调用的次数，用于验证 single-flight / 去抖 / 预取行为

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::{ContentStream, DoneMarker, RemoteStorePort, StoreError};
use crate::domain::ContentKey;

#[derive(Default)]
pub struct FakeRemoteStore {
    contents: DashMap<String, Bytes>,
    markers: DashMap<String, DateTime<Utc>>,
    content_fetches: DashMap<String, usize>,
    marker_checks: AtomicUsize,
    touches: AtomicUsize,
    fail_markers: AtomicBool,
    fail_touches: AtomicBool,
    fetch_delay: Option<Duration>,
}

impl FakeRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次内容拉取前等待 `delay`
    pub fn with_fetch_delay(delay: Duration) -> Self {
        Self {
            fetch_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn put_content(&self, key: &ContentKey, path: &str, data: impl Into<Bytes>) {
        self.contents.insert(format!("{}{}", key, path), data.into());
    }

    pub fn set_marker(&self, key: &ContentKey, at: DateTime<Utc>) {
        self.markers.insert(key.to_string(), at);
    }

    pub fn fail_markers(&self, fail: bool) {
        self.fail_markers.store(fail, Ordering::SeqCst);
    }

    pub fn fail_touches(&self, fail: bool) {
        self.fail_touches.store(fail, Ordering::SeqCst);
    }

    pub fn content_fetches(&self, key: &ContentKey, path: &str) -> usize {
        self.content_fetches
            .get(&format!("{}{}", key, path))
            .map(|c| *c)
            .unwrap_or(0)
    }

    pub fn total_content_fetches(&self) -> usize {
        self.content_fetches.iter().map(|c| *c.value()).sum()
    }

    pub fn marker_checks(&self) -> usize {
        self.marker_checks.load(Ordering::SeqCst)
    }

    pub fn touches(&self) -> usize {
        self.touches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStorePort for FakeRemoteStore {
    async fn get_content(
        &self,
        key: &ContentKey,
        path: &str,
    ) -> Result<Option<ContentStream>, StoreError> {
        let object_key = format!("{}{}", key, path);
        *self.content_fetches.entry(object_key.clone()).or_insert(0) += 1;

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self.contents.get(&object_key).map(|data| {
            // 拆成两个 chunk，模拟分段到达的响应体
            let data = data.clone();
            let mid = data.len() / 2;
            stream::iter(vec![Ok(data.slice(..mid)), Ok(data.slice(mid..))]).boxed()
        }))
    }

    async fn check_done_marker(&self, key: &ContentKey) -> Result<DoneMarker, StoreError> {
        self.marker_checks.fetch_add(1, Ordering::SeqCst);
        if self.fail_markers.load(Ordering::SeqCst) {
            return Err(StoreError::Request("marker check failed".to_string()));
        }
        Ok(self
            .markers
            .get(key.as_str())
            .map(|t| DoneMarker::at(*t))
            .unwrap_or_else(DoneMarker::absent))
    }

    async fn touch(&self, _key: &ContentKey) -> Result<(), StoreError> {
        self.touches.fetch_add(1, Ordering::SeqCst);
        if self.fail_touches.load(Ordering::SeqCst) {
            return Err(StoreError::Request("touch failed".to_string()));
        }
        Ok(())
    }
}
