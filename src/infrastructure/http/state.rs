//! Application State
//!
//! 包含所有 Query Handlers 及请求身份解析

use std::sync::Arc;

use super::dto::IdentityResolver;
use crate::application::{
    CheckDoneHandler, CompletionTrackerPort, FragmentCachePort, GetFragmentHandler, KeepAlivePort,
};

/// 应用状态
pub struct AppState {
    pub identity: IdentityResolver,

    // ========== Query Handlers ==========
    pub check_done_handler: CheckDoneHandler,
    pub get_fragment_handler: GetFragmentHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        identity: IdentityResolver,
        completion: Arc<dyn CompletionTrackerPort>,
        fragment_cache: Arc<dyn FragmentCachePort>,
        keep_alive: Arc<dyn KeepAlivePort>,
    ) -> Self {
        Self {
            identity,
            check_done_handler: CheckDoneHandler::new(completion.clone()),
            get_fragment_handler: GetFragmentHandler::new(completion, fragment_cache, keep_alive),
        }
    }
}
