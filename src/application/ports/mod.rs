//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod completion;
mod fragment_cache;
mod keep_alive;
mod remote_store;

pub use completion::CompletionTrackerPort;
pub use fragment_cache::{CacheError, CachedFragment, FragmentCachePort};
pub use keep_alive::KeepAlivePort;
pub use remote_store::{ContentStream, DoneMarker, RemoteStorePort, StoreError};
