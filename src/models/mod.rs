//! 核心数据模型模块
//!
//! 定义解析引擎的核心数据结构：DialogTurn, SearchQuery, SearchResultSet,
//! ResolvedResponse 和 ResponseBundle。

pub mod content;
pub mod dialog;
pub mod query;
pub mod response;

pub use content::*;
pub use dialog::*;
pub use query::*;
pub use response::*;
