use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::dialog::Geolocation;

/// 排序方向
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// 空间过滤
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpatialFilter {
    pub position: Geolocation,
    pub max_distance: f64,
    pub sort_order: SortOrder,
}

/// A structured query for the search collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query_expression: String,
    pub facet_filters: Vec<String>,
    pub requested_fields: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial: Option<SpatialFilter>,
}

impl SearchQuery {
    pub fn new(query_expression: impl Into<String>) -> Self {
        Self {
            query_expression: query_expression.into(),
            facet_filters: Vec::new(),
            requested_fields: BTreeSet::new(),
            spatial: None,
        }
    }

    pub fn with_facet(mut self, facet: impl Into<String>) -> Self {
        self.facet_filters.push(facet.into());
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.requested_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn with_spatial(mut self, spatial: SpatialFilter) -> Self {
        self.spatial = Some(spatial);
        self
    }
}
