//! S3 Storage - 基于 object_store 的远端存储实现
//!
//! 实现 RemoteStorePort trait
//!
//! 对象 key 布局:
//! - `<key><path>`   分片内容
//! - `done/<key>`    完成标记（由转码流水线写入，只读）
//! - `touch/<key>`   保活标记（内容为当前 Unix 时间戳）

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore, PutPayload};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{ContentStream, DoneMarker, RemoteStorePort, StoreError};
use crate::domain::ContentKey;

const DONE_PREFIX: &str = "done/";
const TOUCH_PREFIX: &str = "touch/";

/// S3 存储配置
#[derive(Debug, Clone)]
pub struct S3StorageConfig {
    /// Bucket 名称
    pub bucket: String,
    /// 区域
    pub region: String,
    /// 自定义 endpoint（MinIO 等 S3 兼容服务）
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// 是否允许非 TLS 连接
    pub allow_http: bool,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
            timeout_secs: 60,
        }
    }
}

/// S3 远端存储
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    timeout: Duration,
}

impl S3Storage {
    /// 创建新的 S3 存储客户端
    pub fn new(config: S3StorageConfig) -> Result<Self, StoreError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_allow_http(config.allow_http)
            .with_client_options(ClientOptions::new().with_timeout(timeout));

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(access_key_id) = &config.access_key_id {
            builder = builder.with_access_key_id(access_key_id);
        }
        if let Some(secret_access_key) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret_access_key);
        }

        let store = builder
            .build()
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3Storage initialized"
        );

        Ok(Self::from_store(Arc::new(store), config.bucket, timeout))
    }

    /// 使用任意 ObjectStore 实现创建
    pub fn from_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            timeout,
        }
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(StoreError::Request(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout.as_secs())),
        }
    }

    /// 区分 NotFound 与其它错误
    async fn with_timeout_opt<T, F>(&self, fut: F) -> Result<Option<T>, StoreError>
    where
        F: Future<Output = object_store::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Ok(Some(v)),
            Ok(Err(object_store::Error::NotFound { .. })) => Ok(None),
            Ok(Err(e)) => Err(StoreError::Request(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// 原样使用 key 作为对象路径
///
/// `Path::from` 会对每段做百分号编码，`Path::parse` 保留原始字符
fn object_path(raw: String) -> Result<Path, StoreError> {
    Path::parse(&raw).map_err(|e| StoreError::InvalidKey(e.to_string()))
}

#[async_trait]
impl RemoteStorePort for S3Storage {
    async fn get_content(
        &self,
        key: &ContentKey,
        path: &str,
    ) -> Result<Option<ContentStream>, StoreError> {
        // 分片路径中无法表示为对象 key 的（空段、`.`、`..`）视为不存在
        let location = match object_path(format!("{}{}", key, path)) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(key = %key, path = %path, error = %e, "Unrepresentable content key");
                return Ok(None);
            }
        };
        tracing::info!(key = %location, bucket = %self.bucket, "Fetching content");

        let result = self.with_timeout_opt(self.store.get(&location)).await?;
        match result {
            Some(r) => Ok(Some(
                r.into_stream()
                    .map(|chunk| chunk.map_err(|e| StoreError::Request(e.to_string())))
                    .boxed(),
            )),
            None => {
                tracing::info!(key = %location, bucket = %self.bucket, "Content not found");
                Ok(None)
            }
        }
    }

    async fn check_done_marker(&self, key: &ContentKey) -> Result<DoneMarker, StoreError> {
        let location = object_path(format!("{}{}", DONE_PREFIX, key))?;
        tracing::info!(key = %location, bucket = %self.bucket, "Check done marker");

        let meta = self.with_timeout_opt(self.store.head(&location)).await?;
        Ok(meta
            .map(|m| DoneMarker::at(m.last_modified))
            .unwrap_or_else(DoneMarker::absent))
    }

    async fn touch(&self, key: &ContentKey) -> Result<(), StoreError> {
        let location = object_path(format!("{}{}", TOUCH_PREFIX, key))?;
        tracing::info!(key = %location, bucket = %self.bucket, "Touching");

        let body = Bytes::from(Utc::now().timestamp().to_string());
        self.with_timeout(self.store.put(&location, PutPayload::from(body)))
            .await?;
        Ok(())
    }
}
