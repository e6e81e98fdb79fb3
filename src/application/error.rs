//! 应用层错误定义
//!
//! 统一的查询错误类型

use thiserror::Error;

use crate::application::ports::{CacheError, StoreError};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 外部服务错误（对象存储）
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 本地存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<CacheError> for ApplicationError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Io(msg) => Self::StorageError(msg),
            CacheError::NotFound => Self::internal("unexpected not-found outcome"),
            CacheError::Aborted => Self::internal("fragment fetch aborted"),
            other => Self::ExternalServiceError(other.to_string()),
        }
    }
}
