//! Queries - CQRS 查询定义
//!
//! 本服务只读：所有用例都是查询

pub mod fragment_queries;
pub mod handlers;

pub use fragment_queries::{CheckDoneQuery, GetFragmentQuery, GetFragmentResponse};
