//! Transcode Web Cache - 转码分片边缘缓存
//!
//! 架构设计: Hexagonal Architecture + CQRS 查询
//!
//! 领域层 (domain/):
//! - ContentKey: 内容标识
//! - Fragment: 顺序分片
//!
//! 应用层 (application/):
//! - Ports: RemoteStore, CompletionTracker, KeepAlive, FragmentCache
//! - Queries: CheckDone, GetFragment
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: 分片、完成标记、播放器
//! - Memory: LazyMap, DonePool, TouchPool
//! - Persistence: 磁盘分片缓存
//! - Worker: 顺序预取
//! - Adapters: S3 远端存储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
