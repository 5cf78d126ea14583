//! Attachment resolution
//!
//! Dereferences the attachments of a winning document. Attachments are
//! fetched concurrently; the quick replies of each attachment are fetched as
//! one further level and never expanded beyond it.

use futures_util::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{
    ContentDocument, ContentReference, ElementValue, QuickReply, ScoredDocument, SearchResultSet,
    element_names,
};
use crate::observability::ResolverMetrics;
use crate::search::{ContentFetch, SearchClient};
use crate::services::query_builder::attachment_query;

pub struct AttachmentResolver {
    search: Arc<dyn SearchClient>,
    fetcher: Arc<dyn ContentFetch>,
    metrics: Arc<ResolverMetrics>,
}

impl AttachmentResolver {
    pub fn new(
        search: Arc<dyn SearchClient>,
        fetcher: Arc<dyn ContentFetch>,
        metrics: Arc<ResolverMetrics>,
    ) -> Self {
        Self {
            search,
            fetcher,
            metrics,
        }
    }

    /// Resolves the attachments of the top document.
    ///
    /// `None` when the top document does not enable attachments; an empty set
    /// when attachments are enabled but neither references nor a filter
    /// query are configured.
    pub async fn resolve(&self, result: &SearchResultSet) -> Result<Option<SearchResultSet>> {
        let Some(top) = result.top() else {
            return Ok(None);
        };
        if !top.flag(element_names::ATTACHMENTS_FLAG) {
            return Ok(None);
        }

        let references = inline_references(top)?;
        if !references.is_empty() {
            debug!("Fetching {} attachments of {}", references.len(), top.id);
            let documents = try_join_all(references.iter().map(|r| self.fetch_attachment(r))).await?;
            let documents: Vec<ScoredDocument> = documents.into_iter().map(Into::into).collect();
            return Ok(Some(SearchResultSet::from_documents(documents)));
        }

        match filter_query(top)? {
            Some(filter) => {
                debug!("Searching attachments of {} with {}", top.id, filter);
                self.metrics.record_search();
                let attachments = self.search.query(&attachment_query(filter)).await?;
                Ok(Some(attachments))
            }
            None => Ok(Some(SearchResultSet::empty())),
        }
    }

    async fn fetch_attachment(&self, reference: &ContentReference) -> Result<ContentDocument> {
        let mut document = self.fetch_reference(reference).await?;
        self.resolve_quick_replies(&mut document).await?;
        Ok(document)
    }

    /// Replaces pending quick replies with their documents. The fetched
    /// quick-reply documents are kept as delivered; their own references
    /// are not followed.
    async fn resolve_quick_replies(&self, document: &mut ContentDocument) -> Result<()> {
        let values = match document.elements.get_mut(element_names::QUICK_REPLIES) {
            None => return Ok(()),
            Some(ElementValue::QuickReplies { values }) => values,
            Some(other) => {
                return Err(AppError::MalformedContent(format!(
                    "{}: quick replies element is a {}",
                    document.id,
                    other.kind()
                )));
            }
        };
        if values.is_empty() {
            return Ok(());
        }

        let resolved = try_join_all(values.iter().map(|reply| async move {
            match reply {
                QuickReply::Pending(reference) => {
                    let action = self.fetch_reference(reference).await?;
                    Ok::<_, AppError>(QuickReply::Resolved(Box::new(action)))
                }
                QuickReply::Resolved(action) => Ok(QuickReply::Resolved(action.clone())),
            }
        }))
        .await?;

        *values = resolved;
        Ok(())
    }

    async fn fetch_reference(&self, reference: &ContentReference) -> Result<ContentDocument> {
        if reference.url.trim().is_empty() {
            return Err(AppError::MalformedContent(
                "content reference without url".to_string(),
            ));
        }
        self.metrics.record_fetch();
        self.fetcher.fetch(&reference.url).await
    }
}

fn inline_references(top: &ScoredDocument) -> Result<Vec<ContentReference>> {
    match top.elements.get(element_names::ATTACHMENT_REFS) {
        None => Ok(Vec::new()),
        Some(ElementValue::Reference { values }) => Ok(values.clone()),
        Some(other) => Err(AppError::MalformedContent(format!(
            "{}: attachment element is a {}",
            top.id,
            other.kind()
        ))),
    }
}

fn filter_query(top: &ScoredDocument) -> Result<Option<&str>> {
    match top.elements.get(element_names::ATTACHMENT_QUERY) {
        None | Some(ElementValue::Scalar { value: Value::Null }) => Ok(None),
        Some(ElementValue::Scalar {
            value: Value::String(filter),
        }) => Ok(Some(filter.trim()).filter(|f| !f.is_empty())),
        Some(other) => Err(AppError::MalformedContent(format!(
            "{}: attachment query element is a {}",
            top.id,
            other.kind()
        ))),
    }
}
