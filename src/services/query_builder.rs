//! Query synthesis
//!
//! Builds the conversational, location and follow-up search queries for a
//! dialog turn. Required entities become mandatory terms, every other
//! recognised entity only boosts ranking.

use tracing::debug;

use crate::config::ResolverConfig;
use crate::models::{DialogTurn, SearchQuery, SortOrder, SpatialFilter};

const CONTENT_CLASSIFICATION: &str = "classification:content";
const RESULT_FIELDS: [&str; 4] = ["id", "name", "document:[json]", "score"];
const ATTACHMENT_FIELDS: [&str; 3] = ["id", "name", "document:[json]"];
const EXCLUDE_LOCATIONS: &str = "-locations:*";

/// Quotes a term for the search expression.
fn quote(term: &str) -> String {
    format!("\"{}\"", term.replace('\\', "\\\\").replace('"', "\\\""))
}

fn boosted(term: &str, weight: u32) -> String {
    format!("{}^{}", quote(term), weight)
}

fn mandatory(term: &str) -> String {
    format!("+{}", quote(term))
}

/// Query used to look up attachments by filter expression.
pub fn attachment_query(filter: &str) -> SearchQuery {
    SearchQuery::new(format!(
        "{} AND type:ChatAttachment AND {}",
        CONTENT_CLASSIFICATION, filter
    ))
    .with_fields(&ATTACHMENT_FIELDS)
}

/// 查询合成器
#[derive(Debug, Clone)]
pub struct QuerySynthesizer {
    config: ResolverConfig,
}

impl QuerySynthesizer {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Query for the primary conversational answer.
    pub fn conversational(&self, turn: &DialogTurn) -> SearchQuery {
        let expression = self.term_expression(turn, self.config.persona_weight);
        let mut query = SearchQuery::new(expression);

        if let Some(node) = turn.last_visited_node() {
            query = query.with_facet(format!("categoryLeaves:({})", quote(node)));
        }
        let query = query
            .with_facet(EXCLUDE_LOCATIONS)
            .with_facet(self.locale_facet(turn))
            .with_fields(&RESULT_FIELDS);

        debug!("Conversational query {:?}", query);
        query
    }

    /// Query for location-scoped answers; `None` when the turn carries no
    /// usable geolocation, which callers resolve to an empty result.
    pub fn location(&self, turn: &DialogTurn) -> Option<SearchQuery> {
        let position = turn.geolocation()?;

        let expression = self.term_expression(turn, self.config.location_persona_weight);
        let mut query = SearchQuery::new(expression);

        if let Some(node) = turn.last_visited_node() {
            query = query.with_facet(format!("categoryLeaves:({})", quote(node)));
        }
        let query = query
            .with_facet(self.locale_facet(turn))
            .with_fields(&RESULT_FIELDS)
            .with_spatial(SpatialFilter {
                position,
                max_distance: self.config.spatial_radius,
                sort_order: SortOrder::Desc,
            });

        debug!("Location query {:?}", query);
        Some(query)
    }

    /// Query for follow-up action content; `None` when no action is pending.
    pub fn follow_up(&self, turn: &DialogTurn) -> Option<SearchQuery> {
        let action = turn.follow_up_action()?;

        let mut terms = Vec::with_capacity(2);
        if let Some(persona) = turn.persona() {
            terms.push(boosted(persona, self.config.follow_up_persona_weight));
        }
        terms.push(mandatory(action));

        let query = SearchQuery::new(format!(
            "{} AND categoryLeaves:({})",
            CONTENT_CLASSIFICATION,
            terms.join(" ")
        ))
        .with_facet(self.locale_facet(turn))
        .with_fields(&RESULT_FIELDS);

        debug!("Follow-up query {:?}", query);
        Some(query)
    }

    fn locale_facet(&self, turn: &DialogTurn) -> String {
        let language = self.config.resolve_language(turn.output_language());
        format!("locale:{}", quote(&language))
    }

    fn term_expression(&self, turn: &DialogTurn, persona_weight: u32) -> String {
        let required: Vec<String> = turn
            .output
            .required_entity_names
            .iter()
            .flat_map(|name| turn.required_entity_values(name))
            .map(|value| mandatory(&value))
            .collect();

        let operator = if required.is_empty() { "OR" } else { "AND" };

        let mut terms = required;
        terms.extend(
            turn.optional_entities()
                .map(|e| boosted(&e.value, self.config.entity_weight)),
        );
        if let Some(persona) = turn.persona() {
            terms.push(boosted(persona, persona_weight));
        }
        if let Some(node) = turn.node_name().or_else(|| turn.last_visited_node()) {
            terms.push(boosted(node, self.config.node_weight));
        }

        if terms.is_empty() {
            return CONTENT_CLASSIFICATION.to_string();
        }

        format!(
            "{} {} categoryLeaves:({})",
            CONTENT_CLASSIFICATION,
            operator,
            terms.join(" ")
        )
    }
}
