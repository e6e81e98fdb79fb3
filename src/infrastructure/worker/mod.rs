//! Worker Layer - Background Task Processing
//!
//! 实现顺序分片预取：TaskQueue 提供有界并发，LookaheadCache 负责调度

mod lookahead;
mod queue;

pub use lookahead::{LookaheadCache, LookaheadConfig};
pub use queue::{Task, TaskQueue};
