//! Fragment Queries - 分片查询定义

use chrono::{DateTime, Utc};

use crate::application::ports::CachedFragment;
use crate::application::queries::handlers::KeepAliveTicket;
use crate::domain::ContentKey;

/// 查询完成标记
#[derive(Debug, Clone)]
pub struct CheckDoneQuery {
    pub key: ContentKey,
}

/// 获取分片
#[derive(Debug, Clone)]
pub struct GetFragmentQuery {
    pub key: ContentKey,
    pub path: String,
}

/// 获取分片结果
#[derive(Debug)]
pub enum GetFragmentResponse {
    /// 转码尚未完成（完成标记不存在）
    NotDone,
    /// 远端不存在该分片
    NotFound,
    /// 命中；内容发送完毕后兑现 `keep_alive`
    Found {
        fragment: CachedFragment,
        last_modified: DateTime<Utc>,
        keep_alive: KeepAliveTicket,
    },
}
