//! Dialog Resolver - 对话响应解析引擎
//!
//! 将对话引擎的一轮输出（意图、实体、访问节点、上下文）解析为内容库中的
//! 响应文档：对话回复、附近位置和后续动作，并按对话状态缓存结果。

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod search;
pub mod services;
