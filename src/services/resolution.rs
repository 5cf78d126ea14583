//! 对话响应解析服务
//!
//! Cache lookup first; on a miss the conversational, location and
//! follow-up pipelines run concurrently and the assembled bundle is cached.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Span, debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::models::{DialogTurn, ResolvedResponse, ResponseBundle, SearchQuery};
use crate::observability::ResolverMetrics;
use crate::search::{ContentFetch, SearchClient};
use crate::services::attachments::AttachmentResolver;
use crate::services::cache::{Clock, ResponseCache, SystemClock};
use crate::services::cache_key::CacheKeyDeriver;
use crate::services::query_builder::QuerySynthesizer;
use crate::services::selection::ResultSelector;

#[async_trait]
pub trait ResolutionService: Send + Sync {
    /// Resolves a dialog turn into its content bundle.
    async fn resolve(&self, turn: &DialogTurn) -> Result<ResponseBundle>;
}

pub struct ResolutionCoordinator {
    deriver: CacheKeyDeriver,
    synthesizer: QuerySynthesizer,
    selector: ResultSelector,
    search: Arc<dyn SearchClient>,
    attachments: AttachmentResolver,
    cache: Arc<ResponseCache>,
    metrics: Arc<ResolverMetrics>,
}

impl ResolutionCoordinator {
    pub fn new(
        config: &ResolverConfig,
        search: Arc<dyn SearchClient>,
        fetcher: Arc<dyn ContentFetch>,
        cache: Arc<ResponseCache>,
        metrics: Arc<ResolverMetrics>,
    ) -> Self {
        Self {
            deriver: CacheKeyDeriver::new(),
            synthesizer: QuerySynthesizer::new(config.clone()),
            selector: ResultSelector::new(),
            attachments: AttachmentResolver::new(search.clone(), fetcher, metrics.clone()),
            search,
            cache,
            metrics,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<ResolverMetrics> {
        &self.metrics
    }

    /// Search, select, then resolve attachments for one query variant.
    async fn run_pipeline(&self, variant: &'static str, query: SearchQuery) -> Result<ResolvedResponse> {
        self.metrics.record_search();
        let raw = self.search.query(&query).await.inspect_err(|e| {
            warn!("{} search failed: {}", variant, e);
        })?;
        let found = raw.total_found;

        let search_result = self.selector.select(raw);
        debug!(
            "{} pipeline kept {} of {} documents",
            variant, search_result.total_found, found
        );

        let attachments = self.attachments.resolve(&search_result).await?;
        Ok(ResolvedResponse {
            search_result,
            attachments,
        })
    }

    async fn resolve_uncached(&self, turn: &DialogTurn) -> Result<ResponseBundle> {
        let conversational_query = self.synthesizer.conversational(turn);
        let location_query = self.synthesizer.location(turn);
        let follow_up_query = self.synthesizer.follow_up(turn);

        let (conversational, location, follow_up) = tokio::try_join!(
            self.run_pipeline("conversational", conversational_query),
            async {
                match location_query {
                    Some(query) => self.run_pipeline("location", query).await,
                    None => Ok(ResolvedResponse::empty()),
                }
            },
            async {
                match follow_up_query {
                    Some(query) => self.run_pipeline("follow-up", query).await.map(Some),
                    None => Ok(None),
                }
            },
        )?;

        Ok(ResponseBundle {
            conversational,
            location,
            follow_up,
        })
    }

    /// Re-randomises document order of a cached bundle; membership is kept.
    fn reshuffle(&self, bundle: &mut ResponseBundle) {
        self.selector
            .shuffle(&mut bundle.conversational.search_result.documents);
        self.selector
            .shuffle(&mut bundle.location.search_result.documents);
        if let Some(follow_up) = bundle.follow_up.as_mut() {
            self.selector.shuffle(&mut follow_up.search_result.documents);
        }
    }
}

#[async_trait]
impl ResolutionService for ResolutionCoordinator {
    #[tracing::instrument(skip_all, fields(cache_key = tracing::field::Empty))]
    async fn resolve(&self, turn: &DialogTurn) -> Result<ResponseBundle> {
        let start_time = Instant::now();
        let key = self.deriver.derive(turn)?;
        Span::current().record("cache_key", key.prefix().as_str());

        if let Some(mut bundle) = self.cache.get(&key) {
            self.reshuffle(&mut bundle);
            let took_ms = start_time.elapsed().as_millis() as u64;
            self.metrics.record_resolve(took_ms, true);
            debug!("Cache hit, resolved in {} ms", took_ms);
            return Ok(bundle);
        }

        let bundle = match self.resolve_uncached(turn).await {
            Ok(bundle) => bundle,
            Err(e) => {
                self.metrics.record_error();
                warn!("Resolution failed: {}", e);
                return Err(e);
            }
        };

        self.cache.set(key, bundle.clone());
        let took_ms = start_time.elapsed().as_millis() as u64;
        self.metrics.record_resolve(took_ms, false);
        info!(
            "Resolved {} conversational, {} location, {} follow-up documents in {} ms",
            bundle.conversational.search_result.total_found,
            bundle.location.search_result.total_found,
            bundle
                .follow_up
                .as_ref()
                .map_or(0, |f| f.search_result.total_found),
            took_ms
        );
        Ok(bundle)
    }
}

pub fn create_resolution_service(
    config: &ResolverConfig,
    search: Arc<dyn SearchClient>,
    fetcher: Arc<dyn ContentFetch>,
    metrics: Arc<ResolverMetrics>,
) -> Arc<ResolutionCoordinator> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(ResponseCache::new(config, clock));
    Arc::new(ResolutionCoordinator::new(
        config, search, fetcher, cache, metrics,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{ScoredDocument, SearchResultSet};
    use crate::search::{MockContentFetch, MockSearchClient};
    use crate::services::cache::ManualClock;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn documents(ids: &[&str]) -> SearchResultSet {
        SearchResultSet::from_documents(
            ids.iter()
                .map(|id| ScoredDocument {
                    id: id.to_string(),
                    name: id.to_string(),
                    score: 4.0,
                    elements: BTreeMap::new(),
                })
                .collect(),
        )
    }

    fn coordinator(search: MockSearchClient) -> ResolutionCoordinator {
        let cache = Arc::new(ResponseCache::with_ttl(
            Duration::from_secs(300),
            Arc::new(ManualClock::new()),
        ));
        ResolutionCoordinator::new(
            &ResolverConfig::default(),
            Arc::new(search),
            Arc::new(MockContentFetch::new()),
            cache,
            Arc::new(ResolverMetrics::default()),
        )
    }

    fn turn(value: serde_json::Value) -> DialogTurn {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_miss_without_location_or_action_runs_one_search() {
        let mut search = MockSearchClient::new();
        search
            .expect_query()
            .withf(|q| q.spatial.is_none())
            .times(1)
            .returning(|_| Ok(documents(&["a"])));

        let bundle = coordinator(search)
            .resolve(&turn(json!({"output": {"visitedNodes": ["root"]}})))
            .await
            .unwrap();

        assert_eq!(bundle.conversational.search_result.ids(), vec!["a"]);
        assert_eq!(bundle.location.search_result.total_found, 0);
        assert!(bundle.follow_up.is_none());
    }

    #[tokio::test]
    async fn test_all_three_pipelines_run() {
        let mut search = MockSearchClient::new();
        search
            .expect_query()
            .withf(|q| q.spatial.is_some())
            .times(1)
            .returning(|_| Ok(documents(&["branch"])));
        search
            .expect_query()
            .withf(|q| q.query_expression.contains("+\"book\""))
            .times(1)
            .returning(|_| Ok(documents(&["booking"])));
        search
            .expect_query()
            .times(1)
            .returning(|_| Ok(documents(&["answer"])));

        let bundle = coordinator(search)
            .resolve(&turn(json!({
                "output": {"visitedNodes": ["root"], "action": "book"},
                "context": {"geolocation": {"lat": 1.0, "lng": 2.0}}
            })))
            .await
            .unwrap();

        assert_eq!(bundle.conversational.search_result.ids(), vec!["answer"]);
        assert_eq!(bundle.location.search_result.ids(), vec!["branch"]);
        assert_eq!(
            bundle.follow_up.unwrap().search_result.ids(),
            vec!["booking"]
        );
    }

    #[tokio::test]
    async fn test_hit_skips_search() {
        let mut search = MockSearchClient::new();
        search
            .expect_query()
            .times(1)
            .returning(|_| Ok(documents(&["a", "b", "c"])));

        let coordinator = coordinator(search);
        let turn = turn(json!({"output": {"visitedNodes": ["root"]}}));

        let first = coordinator.resolve(&turn).await.unwrap();
        let second = coordinator.resolve(&turn).await.unwrap();

        let mut first_ids = first.conversational.search_result.ids();
        let mut second_ids = second.conversational.search_result.ids();
        first_ids.sort();
        second_ids.sort();
        assert_eq!(first_ids, second_ids);

        let output = coordinator.metrics().gather();
        assert!(output.contains("cache_hits_total 1"));
        assert!(output.contains("search_requests_total 1"));
    }

    #[tokio::test]
    async fn test_failure_propagates_and_is_not_cached() {
        let mut search = MockSearchClient::new();
        search
            .expect_query()
            .times(2)
            .returning(|_| Err(AppError::Search("unavailable".into())));

        let coordinator = coordinator(search);
        let turn = turn(json!({"output": {"visitedNodes": ["root"]}}));

        assert!(matches!(
            coordinator.resolve(&turn).await,
            Err(AppError::Search(_))
        ));
        assert!(coordinator.cache().is_empty());
        assert!(coordinator.resolve(&turn).await.is_err());
    }
}
