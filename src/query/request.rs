//! Assembled search requests.

use serde_json::{Map, Value};

use crate::query::filter::FilterExpression;
use crate::query::function_score::QueryClause;
use crate::query::highlight::HighlightBuilder;
use crate::query::sort::SortRule;
use crate::query::source::SourceFilter;

/// The clause that selects documents.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryClause {
    /// Scoring query.
    Query(QueryClause),
    /// Non-scoring filter.
    Filter(FilterExpression),
}

/// An immutable, transport-ready description of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub(crate) index: String,
    pub(crate) route: Option<String>,
    pub(crate) primary: PrimaryClause,
    pub(crate) sort: Vec<SortRule>,
    pub(crate) source: Option<SourceFilter>,
    pub(crate) highlight: HighlightBuilder,
}

impl SearchRequest {
    /// Target index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Routing key, sent as a transport parameter.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Document selecting clause.
    pub fn primary(&self) -> &PrimaryClause {
        &self.primary
    }

    /// Scoring query, if the request was built in query mode.
    pub fn query(&self) -> Option<&QueryClause> {
        match &self.primary {
            PrimaryClause::Query(query) => Some(query),
            PrimaryClause::Filter(_) => None,
        }
    }

    /// Non-scoring filter, if the request was built in filter mode.
    pub fn filter(&self) -> Option<&FilterExpression> {
        match &self.primary {
            PrimaryClause::Query(_) => None,
            PrimaryClause::Filter(filter) => Some(filter),
        }
    }

    /// Sort rules in precedence order.
    pub fn sort(&self) -> &[SortRule] {
        &self.sort
    }

    /// Source projection; `None` returns whole documents.
    pub fn source(&self) -> Option<&SourceFilter> {
        self.source.as_ref()
    }

    /// Highlight configuration.
    pub fn highlight(&self) -> &HighlightBuilder {
        &self.highlight
    }

    /// Render the request body in the backend's search DSL.
    ///
    /// The routing key is not part of the body; send it with [`Self::route`].
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();

        let query = match &self.primary {
            PrimaryClause::Query(query) => query.to_json(),
            PrimaryClause::Filter(filter) => FilterExpression::non_scoring(filter.clone()).to_json(),
        };
        body.insert("query".to_string(), query);

        if !self.sort.is_empty() {
            let sort = self.sort.iter().map(SortRule::to_json).collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }

        if let Some(source) = &self.source {
            body.insert("_source".to_string(), source.to_json());
        }

        body.insert("highlight".to_string(), self.highlight.to_json());

        Value::Object(body)
    }
}
