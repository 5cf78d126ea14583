//! 内容交付 API 客户端

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DeliveryConfig;
use crate::error::{AppError, Result};
use crate::models::{ContentDocument, ElementValue, ScoredDocument, SearchQuery, SearchResultSet};
use crate::search::{ContentFetch, SearchClient};

/// Spatial field indexed by the delivery search.
const SPATIAL_FIELD: &str = "locations";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliverySearchResponse {
    #[serde(default)]
    num_found: usize,
    #[serde(default)]
    documents: Vec<DeliverySearchDocument>,
}

#[derive(Deserialize)]
struct DeliverySearchDocument {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    document: Option<DeliveryDocumentBody>,
}

#[derive(Deserialize, Default)]
struct DeliveryDocumentBody {
    #[serde(default)]
    elements: BTreeMap<String, ElementValue>,
}

impl From<DeliverySearchResponse> for SearchResultSet {
    fn from(response: DeliverySearchResponse) -> Self {
        let documents = response
            .documents
            .into_iter()
            .map(|doc| ScoredDocument {
                id: doc.id,
                name: doc.name,
                score: doc.score,
                elements: doc.document.unwrap_or_default().elements,
            })
            .collect();

        SearchResultSet {
            total_found: response.num_found,
            documents,
        }
    }
}

/// reqwest client for the content delivery API.
///
/// Implements both [`SearchClient`] and [`ContentFetch`].
pub struct DeliveryClient {
    client: reqwest::Client,
    search_url: String,
    host_url: String,
}

impl DeliveryClient {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        let base = config.base_url.trim_end_matches('/');
        let search_url = if config.tenant_id.is_empty() {
            format!("{}/delivery/v1/search", base)
        } else {
            format!("{}/{}/delivery/v1/search", base, config.tenant_id)
        };

        Ok(Self {
            client,
            search_url,
            host_url: config.host_url.trim_end_matches('/').to_string(),
        })
    }

    /// Translates a query into delivery search parameters.
    fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.query_expression.clone())];

        for facet in &query.facet_filters {
            params.push(("fq", facet.clone()));
        }

        if !query.requested_fields.is_empty() {
            let fields: Vec<&str> = query.requested_fields.iter().map(String::as_str).collect();
            params.push(("fl", fields.join(",")));
        }

        if let Some(spatial) = &query.spatial {
            params.push(("fq", "{!geofilt}".to_string()));
            params.push(("sfield", SPATIAL_FIELD.to_string()));
            params.push((
                "pt",
                format!("{},{}", spatial.position.lat, spatial.position.lng),
            ));
            params.push(("d", spatial.max_distance.to_string()));
            params.push(("sort", format!("geodist() {}", spatial.sort_order.as_str())));
        }

        params
    }

    fn content_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.host_url, url)
        } else {
            format!("{}/{}", self.host_url, url)
        }
    }
}

#[async_trait]
impl SearchClient for DeliveryClient {
    async fn query(&self, query: &SearchQuery) -> Result<SearchResultSet> {
        let params = Self::search_params(query);
        debug!("Delivery search {} {:?}", self.search_url, params);

        let response = self
            .client
            .get(&self.search_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::Search(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("Delivery search failed with {}: {}", status, error_text);
            return Err(AppError::Search(format!(
                "search returned {}: {}",
                status, error_text
            )));
        }

        let body: DeliverySearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("invalid search response: {}", e)))?;

        Ok(body.into())
    }
}

#[async_trait]
impl ContentFetch for DeliveryClient {
    async fn fetch(&self, url: &str) -> Result<ContentDocument> {
        let target = self.content_url(url);
        debug!("Fetching content {}", target);

        let response = self
            .client
            .get(&target)
            .send()
            .await
            .map_err(|e| AppError::ContentFetch(format!("{}: {}", target, e)))?;

        if !response.status().is_success() {
            warn!("Content fetch {} failed with {}", target, response.status());
            return Err(AppError::ContentFetch(format!(
                "{} returned {}",
                target,
                response.status()
            )));
        }

        response
            .json::<ContentDocument>()
            .await
            .map_err(|e| AppError::ContentFetch(format!("{}: invalid document: {}", target, e)))
    }
}

pub fn create_delivery_client(config: &DeliveryConfig) -> Result<Arc<DeliveryClient>> {
    Ok(Arc::new(DeliveryClient::new(config)?))
}
