//! Persistence Layer - 数据持久化
//!
//! 本地磁盘缓存实现

pub mod disk;

pub use self::disk::{DiskCacheConfig, DiskContentCache};
