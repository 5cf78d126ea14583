//! 内容仓库协作方接口
//!
//! 搜索与内容获取均由外部服务完成，解析引擎只依赖这里的 trait。

pub mod delivery;

pub use delivery::{DeliveryClient, create_delivery_client};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContentDocument, SearchQuery, SearchResultSet};

/// Executes structured queries against the content repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn query(&self, query: &SearchQuery) -> Result<SearchResultSet>;
}

/// Dereferences a content URL into a document.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ContentDocument>;
}
