//! Query Handlers - 查询处理器

mod fragment_handlers;

pub use fragment_handlers::{CheckDoneHandler, GetFragmentHandler, KeepAliveTicket};
