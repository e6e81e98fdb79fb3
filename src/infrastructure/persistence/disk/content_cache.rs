//! Disk Content Cache - 磁盘分片缓存
//!
//! 实现 FragmentCachePort trait
//!
//! 缓存条目 key = sha1(内容标识 + 分片路径 + 完成标记时间)，文件名即条目 key。
//! 写入流程：`_<entry_key>` 临时文件 → rename 为 `<entry_key>`，读者永远看不到半个文件。
//! 本服务从不删除条目；过期文件由外部进程按修改时间清理，命中时刷新修改时间。

use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::application::ports::{
    CacheError, CachedFragment, CompletionTrackerPort, FragmentCachePort, RemoteStorePort,
};
use crate::domain::ContentKey;
use crate::infrastructure::memory::{ComputeAborted, LazyMap, LazyMapConfig};

/// 磁盘缓存配置
#[derive(Debug, Clone)]
pub struct DiskCacheConfig {
    /// 缓存目录
    pub dir: PathBuf,
    /// 缓存 key 是否包含完成标记时间（标记更新即失效）
    pub invalidate_on_marker: bool,
    /// 单次远端拉取（请求 + 写盘）超时
    pub fetch_timeout: Duration,
    /// 去重用的 LazyMap 配置
    pub lazy: LazyMapConfig,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            invalidate_on_marker: true,
            fetch_timeout: Duration::from_secs(60),
            lazy: LazyMapConfig::default(),
        }
    }
}

/// 磁盘分片缓存
pub struct DiskContentCache {
    invalidate_on_marker: bool,
    completion: Arc<dyn CompletionTrackerPort>,
    fetcher: Fetcher,
    preloads: LazyMap<(), CacheError>,
}

/// 落盘工作所需的状态，随 compute 一起移入后台任务
#[derive(Clone)]
struct Fetcher {
    dir: PathBuf,
    fetch_timeout: Duration,
    store: Arc<dyn RemoteStorePort>,
}

impl DiskContentCache {
    /// 创建缓存，确保缓存目录存在
    pub async fn new(
        config: DiskCacheConfig,
        store: Arc<dyn RemoteStorePort>,
        completion: Arc<dyn CompletionTrackerPort>,
    ) -> Result<Self, CacheError> {
        fs::create_dir_all(&config.dir).await?;

        tracing::info!(
            dir = %config.dir.display(),
            invalidate_on_marker = config.invalidate_on_marker,
            capacity = config.lazy.capacity,
            "DiskContentCache initialized"
        );

        Ok(Self {
            invalidate_on_marker: config.invalidate_on_marker,
            completion,
            fetcher: Fetcher {
                dir: config.dir,
                fetch_timeout: config.fetch_timeout,
                store,
            },
            preloads: LazyMap::new(config.lazy),
        })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    async fn entry_key(&self, key: &ContentKey, path: &str) -> Result<String, CacheError> {
        let marker = if self.invalidate_on_marker {
            self.completion
                .done(key)
                .await
                .map_err(CacheError::Completion)?
                .last_modified
        } else {
            None
        };
        Ok(key.cache_entry_key(path, marker.as_ref()))
    }

    /// 确保条目已落盘，返回条目 key
    async fn preload_entry(&self, key: &ContentKey, path: &str) -> Result<String, CacheError> {
        let entry_key = self.entry_key(key, path).await?;

        let fetcher = self.fetcher.clone();
        let key = key.clone();
        let path = path.to_string();
        let target_key = entry_key.clone();
        self.preloads
            .get(&entry_key, move || async move {
                fetcher.populate(&key, &path, &target_key).await
            })
            .await?;
        Ok(entry_key)
    }
}

impl Fetcher {
    fn entry_path(&self, entry_key: &str) -> PathBuf {
        self.dir.join(entry_key)
    }

    fn temp_path(&self, entry_key: &str) -> PathBuf {
        self.dir.join(format!("_{}", entry_key))
    }

    /// 去重后的实际工作：文件不存在则拉取，存在则刷新修改时间
    async fn populate(
        &self,
        key: &ContentKey,
        path: &str,
        entry_key: &str,
    ) -> Result<(), CacheError> {
        let target = self.entry_path(entry_key);

        match fs::metadata(&target).await {
            Ok(_) => {
                refresh_modified(target.clone()).await?;
                tracing::debug!(path = %target.display(), "Preload data already exists");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.download(key, path, entry_key, &target).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn download(
        &self,
        key: &ContentKey,
        path: &str,
        entry_key: &str,
        target: &Path,
    ) -> Result<(), CacheError> {
        let temp = self.temp_path(entry_key);

        let written = match tokio::time::timeout(
            self.fetch_timeout,
            self.write_remote(key, path, &temp),
        )
        .await
        {
            Ok(r) => r,
            Err(_) => Err(CacheError::Timeout(self.fetch_timeout.as_secs())),
        };

        if let Err(e) = written {
            if !matches!(e, CacheError::NotFound) {
                let _ = fs::remove_file(&temp).await;
            }
            return Err(e);
        }

        fs::rename(&temp, target).await?;

        tracing::debug!(
            key = %key,
            path = %path,
            entry_key = %entry_key,
            "Fragment cached"
        );
        Ok(())
    }

    async fn write_remote(
        &self,
        key: &ContentKey,
        path: &str,
        temp: &Path,
    ) -> Result<(), CacheError> {
        let mut stream = self
            .store
            .get_content(key, path)
            .await
            .map_err(CacheError::Remote)?
            .ok_or(CacheError::NotFound)?;

        let mut file = fs::File::create(temp).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CacheError::Remote)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }
}

/// 把文件修改时间刷新为当前时间（供外部清理进程判断活跃度）
async fn refresh_modified(path: PathBuf) -> Result<(), CacheError> {
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::options().write(true).open(&path)?;
        file.set_modified(SystemTime::now())
    })
    .await
    .map_err(|e| CacheError::Io(e.to_string()))??;
    Ok(())
}

impl From<ComputeAborted> for CacheError {
    fn from(_: ComputeAborted) -> Self {
        CacheError::Aborted
    }
}

#[async_trait]
impl FragmentCachePort for DiskContentCache {
    async fn get(
        &self,
        key: &ContentKey,
        path: &str,
    ) -> Result<Option<CachedFragment>, CacheError> {
        let entry_key = match self.preload_entry(key, path).await {
            Ok(k) => k,
            Err(CacheError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let file = fs::File::open(self.fetcher.entry_path(&entry_key)).await?;
        let size = file.metadata().await?.len();
        Ok(Some(CachedFragment { file, size }))
    }

    async fn preload(&self, key: &ContentKey, path: &str) -> Result<(), CacheError> {
        self.preload_entry(key, path).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::storage::FakeRemoteStore;
    use crate::infrastructure::memory::DonePool;
    use chrono::{TimeZone, Utc};
    use futures_util::future::join_all;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    fn key() -> ContentKey {
        ContentKey::new("transcoder", "hash", "/movie.mkv")
    }

    async fn create_cache(
        dir: &Path,
        store: Arc<FakeRemoteStore>,
        done_ttl: Duration,
    ) -> DiskContentCache {
        let config = DiskCacheConfig {
            dir: dir.to_path_buf(),
            ..DiskCacheConfig::default()
        };
        let completion = Arc::new(DonePool::with_ttl(store.clone(), done_ttl));
        DiskContentCache::new(config, store, completion).await.unwrap()
    }

    async fn read_all(fragment: CachedFragment) -> Vec<u8> {
        let mut file = fragment.file;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        buf
    }

    fn file_names(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_get_fetches_and_serves_content() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FakeRemoteStore::new());
        store.set_marker(&key(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        store.put_content(&key(), "/seg-1.ts", &b"segment one"[..]);
        let cache = create_cache(dir.path(), store.clone(), Duration::from_secs(600)).await;

        let fragment = cache.get(&key(), "/seg-1.ts").await.unwrap().unwrap();
        assert_eq!(fragment.size, 11);
        assert_eq!(read_all(fragment).await, b"segment one");

        // 第二次直接命中
        let fragment = cache.get(&key(), "/seg-1.ts").await.unwrap().unwrap();
        assert_eq!(read_all(fragment).await, b"segment one");
        assert_eq!(store.content_fetches(&key(), "/seg-1.ts"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_preload_fetches_once() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FakeRemoteStore::with_fetch_delay(Duration::from_millis(50)));
        store.set_marker(&key(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        store.put_content(&key(), "/seg-1.ts", &b"payload"[..]);
        let cache = create_cache(dir.path(), store.clone(), Duration::from_secs(600)).await;

        let k = key();
        let results = join_all((0..20).map(|_| cache.preload(&k, "/seg-1.ts"))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(store.content_fetches(&key(), "/seg-1.ts"), 1);
        let names = file_names(dir.path());
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with('_'));
    }

    #[tokio::test]
    async fn test_cancelled_request_does_not_refetch() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FakeRemoteStore::with_fetch_delay(Duration::from_millis(200)));
        store.set_marker(&key(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        store.put_content(&key(), "/seg-1.ts", &b"payload"[..]);
        let cache = Arc::new(create_cache(dir.path(), store.clone(), Duration::from_secs(600)).await);

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&key(), "/seg-1.ts").await.map(|f| f.is_some()) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get(&key(), "/seg-1.ts").await.map(|f| f.is_some()) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // 客户端断开：第一个请求被取消
        first.abort();

        assert!(matches!(second.await.unwrap(), Ok(true)));
        assert_eq!(store.content_fetches(&key(), "/seg-1.ts"), 1);
        let names = file_names(dir.path());
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with('_'));
    }

    #[tokio::test]
    async fn test_absent_content_is_none() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FakeRemoteStore::new());
        store.set_marker(&key(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let cache = create_cache(dir.path(), store.clone(), Duration::from_secs(600)).await;

        assert!(cache.get(&key(), "/missing.ts").await.unwrap().is_none());
        assert!(matches!(
            cache.preload(&key(), "/missing.ts").await,
            Err(CacheError::NotFound)
        ));
        // NotFound 结果同样被缓存
        assert_eq!(store.content_fetches(&key(), "/missing.ts"), 1);
        assert!(file_names(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_marker_update_invalidates_entry() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FakeRemoteStore::new());
        store.set_marker(&key(), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        store.put_content(&key(), "/seg-1.ts", &b"first transcode"[..]);
        let cache = create_cache(dir.path(), store.clone(), Duration::from_millis(50)).await;

        let fragment = cache.get(&key(), "/seg-1.ts").await.unwrap().unwrap();
        assert_eq!(read_all(fragment).await, b"first transcode");

        // 重新转码：标记时间和内容都变了
        store.set_marker(&key(), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        store.put_content(&key(), "/seg-1.ts", &b"second transcode"[..]);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let fragment = cache.get(&key(), "/seg-1.ts").await.unwrap().unwrap();
        assert_eq!(read_all(fragment).await, b"second transcode");
        assert_eq!(store.content_fetches(&key(), "/seg-1.ts"), 2);
        // 旧条目不主动删除
        assert_eq!(file_names(dir.path()).len(), 2);
    }

    #[tokio::test]
    async fn test_existing_file_is_refreshed_not_fetched() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FakeRemoteStore::new());
        let marker = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        store.set_marker(&key(), marker);
        let cache = create_cache(dir.path(), store.clone(), Duration::from_secs(600)).await;

        let entry = dir
            .path()
            .join(key().cache_entry_key("/seg-1.ts", Some(&marker)));
        std::fs::write(&entry, b"left by a previous run").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        std::fs::File::options()
            .write(true)
            .open(&entry)
            .unwrap()
            .set_modified(old)
            .unwrap();

        cache.preload(&key(), "/seg-1.ts").await.unwrap();

        assert_eq!(store.content_fetches(&key(), "/seg-1.ts"), 0);
        let modified = std::fs::metadata(&entry).unwrap().modified().unwrap();
        assert!(modified > old);
    }

    #[tokio::test]
    async fn test_completion_error_propagates() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FakeRemoteStore::new());
        store.fail_markers(true);
        let cache = create_cache(dir.path(), store.clone(), Duration::from_secs(600)).await;

        assert!(matches!(
            cache.get(&key(), "/seg-1.ts").await,
            Err(CacheError::Completion(_))
        ));
        assert_eq!(store.content_fetches(&key(), "/seg-1.ts"), 0);
    }
}
