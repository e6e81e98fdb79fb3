//! Domain Layer - 领域层
//!
//! 纯值类型，不依赖任何 I/O:
//! - ContentKey: 内容标识及缓存条目 key 推导
//! - Fragment: 顺序分片描述

mod content_key;
mod fragment;

pub use content_key::ContentKey;
pub use fragment::Fragment;
