//! Memory Layer - In-Memory State Management
//!
//! 进程内状态，不持久化、不跨实例共享：
//! - LazyMap: 记忆化异步缓存（single-flight + TTL + 容量上限）
//! - DonePool: 完成标记缓存
//! - TouchPool: 保活信号去抖

mod done_pool;
mod lazy_map;
mod touch_pool;

pub use done_pool::{DonePool, DEFAULT_DONE_TTL};
pub use lazy_map::{ComputeAborted, LazyMap, LazyMapConfig};
pub use touch_pool::{TouchPool, DEFAULT_TOUCH_TTL};
