//! Disk Persistence - 本地磁盘分片缓存

mod content_cache;

pub use content_cache::{DiskCacheConfig, DiskContentCache};
