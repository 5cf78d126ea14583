use serde::{Deserialize, Serialize};

use crate::models::content::SearchResultSet;

/// The resolved output of one query variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResponse {
    pub search_result: SearchResultSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<SearchResultSet>,
}

impl ResolvedResponse {
    /// Successful empty outcome, e.g. no geolocation yet.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// 三路解析结果，缓存和返回的单位
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBundle {
    pub conversational: ResolvedResponse,
    pub location: ResolvedResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<ResolvedResponse>,
}
