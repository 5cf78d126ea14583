//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod resolve_handler;

pub use resolve_handler::*;
