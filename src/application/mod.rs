//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（RemoteStore、CompletionTracker、KeepAlive、FragmentCache）
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod error;
pub mod ports;
pub mod queries;

pub use error::ApplicationError;

pub use ports::{
    CacheError, CachedFragment, CompletionTrackerPort, ContentStream, DoneMarker,
    FragmentCachePort, KeepAlivePort, RemoteStorePort, StoreError,
};

pub use queries::{
    handlers::{CheckDoneHandler, GetFragmentHandler, KeepAliveTicket},
    CheckDoneQuery, GetFragmentQuery, GetFragmentResponse,
};
