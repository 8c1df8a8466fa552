//! The typed, fluent query builder.
//!
//! A [`DynamicQuery`] accumulates filters, scoring functions, sort rules, a
//! source projection and highlight registrations for one entity type, then
//! assembles them into a [`SearchRequest`]. Every call that touches a
//! property resolves it immediately through the shared [`EntityCache`], so
//! an unknown property fails at the call that mentions it.
//!
//! ```
//! use std::sync::Arc;
//!
//! use dynamic_query::prelude::*;
//!
//! struct Product;
//!
//! impl Product {
//!     const STATUS: Property<Product, String> = Property::new("status");
//!     const PRICE: Property<Product, f64> = Property::new("price");
//! }
//!
//! impl Entity for Product {
//!     fn schema() -> Result<EntitySchema> {
//!         EntitySchema::builder("products").field("status").field("price").build()
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let cache = Arc::new(EntityCache::new());
//! let request = DynamicQuery::<Product>::query(cache)?
//!     .and(Product::STATUS, FilterOperator::Equal, "active")?
//!     .weight_function_when(Product::PRICE, FilterOperator::LessThan, 10.0, 2.0)?
//!     .order_by(Product::PRICE, SortOrder::Asc)?
//!     .build_request();
//!
//! assert_eq!(request.index(), "products");
//! assert!(request.to_body()["query"].get("function_score").is_some());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use log::trace;
use serde::Serialize;

use crate::config::QueryConfig;
use crate::error::Result;
use crate::query::filter::{FilterExpression, FilterGroup, FilterOperator, build_typed_predicate};
use crate::query::function_score::{
    BoostMode, CombinePolicy, ScoreFunction, ScoreMode, ScoringFunction, compile,
};
use crate::query::highlight::{HighlightBuilder, HighlightResultMapper};
use crate::query::request::{PrimaryClause, SearchRequest};
use crate::query::sort::{SortOrder, SortRule};
use crate::query::source::SourceFilter;
use crate::schema::{Entity, EntityCache, Property, PropertyRef};

/// Whether a query scores documents or only filters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Relevance scoring is active; scoring functions apply.
    Query,
    /// Pure boolean filtering; nothing is scored.
    Filter,
}

/// Fluent builder of search requests over entity `T`.
///
/// Not meant to be shared between threads while it is being built; the
/// [`EntityCache`] it resolves properties through is.
pub struct DynamicQuery<T: Entity> {
    cache: Arc<EntityCache>,
    mode: QueryMode,
    index: String,
    route: Option<String>,
    filters: FilterGroup,
    functions: Vec<ScoringFunction>,
    policy: CombinePolicy,
    sort: Vec<SortRule>,
    source: SourceFilter,
    highlight: HighlightBuilder,
    result_mapper: HighlightResultMapper<T>,
}

impl<T: Entity> DynamicQuery<T> {
    /// Start a scoring query.
    pub fn query(cache: Arc<EntityCache>) -> Result<Self> {
        Self::with_config(cache, QueryMode::Query, &QueryConfig::default())
    }

    /// Start a filter-only query.
    pub fn filter(cache: Arc<EntityCache>) -> Result<Self> {
        Self::with_config(cache, QueryMode::Filter, &QueryConfig::default())
    }

    /// Start a query seeded from a configuration.
    ///
    /// Loads the schema of `T` into the cache if it is not there yet.
    pub fn with_config(
        cache: Arc<EntityCache>,
        mode: QueryMode,
        config: &QueryConfig,
    ) -> Result<Self> {
        let info = cache.entity_info::<T>()?;
        let index = info.index_name().to_string();

        Ok(DynamicQuery {
            cache,
            mode,
            index,
            route: None,
            filters: FilterGroup::new(),
            functions: Vec::new(),
            policy: config.combine_policy(),
            sort: Vec::new(),
            source: SourceFilter::new(),
            highlight: HighlightBuilder::with_config(config.highlight.clone()),
            result_mapper: HighlightResultMapper::new(),
        })
    }

    /// Set the routing key. Blank keys are ignored at assembly.
    pub fn route<S: Into<String>>(mut self, route: S) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Build a predicate on a property without adding it anywhere.
    ///
    /// Useful for composing nested [`FilterGroup`]s.
    pub fn predicate<V, U>(
        &self,
        property: Property<T, V>,
        operator: FilterOperator,
        value: U,
    ) -> Result<FilterExpression>
    where
        V: Serialize,
        U: Into<V>,
    {
        let column = self.cache.column_name(property)?;
        let value: V = value.into();
        build_typed_predicate(column, operator, &value)
    }

    /// Require documents to satisfy a predicate.
    pub fn and<V, U>(
        mut self,
        property: Property<T, V>,
        operator: FilterOperator,
        value: U,
    ) -> Result<Self>
    where
        V: Serialize,
        U: Into<V>,
    {
        let predicate = self.predicate(property, operator, value)?;
        self.filters.add_and(predicate);
        Ok(self)
    }

    /// Add an alternative predicate; at least one alternative has to match.
    pub fn or<V, U>(
        mut self,
        property: Property<T, V>,
        operator: FilterOperator,
        value: U,
    ) -> Result<Self>
    where
        V: Serialize,
        U: Into<V>,
    {
        let predicate = self.predicate(property, operator, value)?;
        self.filters.add_or(predicate);
        Ok(self)
    }

    /// Require documents to satisfy a nested group.
    pub fn and_group(mut self, group: FilterGroup) -> Self {
        if !group.is_empty() {
            self.filters.add_and(group.to_expression());
        }
        self
    }

    /// Add a nested group as an alternative.
    pub fn or_group(mut self, group: FilterGroup) -> Self {
        if !group.is_empty() {
            self.filters.add_or(group.to_expression());
        }
        self
    }

    /// Return only the given properties.
    ///
    /// Repeated calls add to the selection.
    pub fn select(mut self, properties: &[PropertyRef<T>]) -> Result<Self> {
        let columns = self.column_names(properties)?;
        self.source.add_includes(columns);
        Ok(self)
    }

    /// Leave the given properties out of returned documents.
    ///
    /// Repeated calls add to the exclusion.
    pub fn ignore(mut self, properties: &[PropertyRef<T>]) -> Result<Self> {
        let columns = self.column_names(properties)?;
        self.source.add_excludes(columns);
        Ok(self)
    }

    /// Add raw column names to the selection.
    pub fn add_selected_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source.add_includes(columns);
        self
    }

    /// Add raw column names to the exclusion.
    pub fn add_ignored_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source.add_excludes(columns);
        self
    }

    /// Order by a property.
    pub fn order_by<V>(self, property: Property<T, V>, order: SortOrder) -> Result<Self> {
        self.order_by_if(true, property, order)
    }

    /// Order by a property when `enabled`; otherwise leave the query untouched.
    pub fn order_by_if<V>(
        mut self,
        enabled: bool,
        property: Property<T, V>,
        order: SortOrder,
    ) -> Result<Self> {
        if enabled {
            let column = self.cache.column_name(property)?;
            self.sort.push(SortRule::field(column, order));
        }
        Ok(self)
    }

    /// Order by relevance score.
    pub fn order_by_score(self, order: SortOrder) -> Self {
        self.order_by_score_if(true, order)
    }

    /// Order by relevance score when `enabled`.
    pub fn order_by_score_if(mut self, enabled: bool, order: SortOrder) -> Self {
        if enabled {
            self.sort.push(SortRule::Score(order));
        }
        self
    }

    /// Add an unconditional constant weight.
    ///
    /// Fails for a NaN or infinite weight.
    pub fn weight_function(mut self, weight: f32) -> Result<Self> {
        let function = ScoreFunction::weight(weight)?;
        self.functions.push(ScoringFunction::new(function));
        Ok(self)
    }

    /// Add a constant weight for documents matching a predicate.
    pub fn weight_function_when<V, U>(
        mut self,
        property: Property<T, V>,
        operator: FilterOperator,
        value: U,
        weight: f32,
    ) -> Result<Self>
    where
        V: Serialize,
        U: Into<V>,
    {
        let function = ScoreFunction::weight(weight)?;
        let filter = self.predicate(property, operator, value)?;
        self.functions
            .push(ScoringFunction::filtered(filter, function));
        Ok(self)
    }

    /// Boost by a numeric property times `factor`.
    pub fn field_value_factor_function<V>(
        mut self,
        property: Property<T, V>,
        factor: f32,
    ) -> Result<Self> {
        let field = self.cache.column_name(property)?;
        let function = ScoreFunction::field_value_factor(field, factor)?;
        self.functions.push(ScoringFunction::new(function));
        Ok(self)
    }

    /// Boost by a numeric property times `factor`, for documents matching a predicate.
    pub fn field_value_factor_function_when<V, W, U>(
        mut self,
        property: Property<T, V>,
        factor: f32,
        filter_property: Property<T, W>,
        operator: FilterOperator,
        value: U,
    ) -> Result<Self>
    where
        W: Serialize,
        U: Into<W>,
    {
        let filter = self.predicate(filter_property, operator, value)?;
        let field = self.cache.column_name(property)?;
        let function = ScoreFunction::field_value_factor(field, factor)?;
        self.functions
            .push(ScoringFunction::filtered(filter, function));
        Ok(self)
    }

    /// Add an unconditional random score.
    pub fn random_function(mut self) -> Self {
        self.functions.push(ScoringFunction::new(ScoreFunction::Random));
        self
    }

    /// Add a random score for documents matching a predicate.
    pub fn random_function_when<V, U>(
        mut self,
        property: Property<T, V>,
        operator: FilterOperator,
        value: U,
    ) -> Result<Self>
    where
        V: Serialize,
        U: Into<V>,
    {
        let filter = self.predicate(property, operator, value)?;
        self.functions
            .push(ScoringFunction::filtered(filter, ScoreFunction::Random));
        Ok(self)
    }

    /// Set how the query score and the function score combine.
    pub fn boost_mode(mut self, mode: BoostMode) -> Self {
        self.policy.boost_mode = mode;
        self
    }

    /// Set how function scores aggregate.
    pub fn score_mode(mut self, mode: ScoreMode) -> Self {
        self.policy.score_mode = mode;
        self
    }

    /// Cap the function score.
    ///
    /// The cap has to be finite and non-negative.
    pub fn max_boost(mut self, max_boost: f32) -> Result<Self> {
        self.policy.max_boost = Some(CombinePolicy::check_max_boost(max_boost)?);
        Ok(self)
    }

    /// Highlight a property and register the callback receiving its fragment.
    pub fn highlight_mapping<F>(
        mut self,
        property: Property<T, String>,
        writer: F,
    ) -> Result<Self>
    where
        F: Fn(&mut T, &str) + Send + Sync + 'static,
    {
        let column = self.cache.column_name(property)?;
        self.highlight.field(column.clone());
        self.result_mapper.register_hit_mapping(column, writer);
        Ok(self)
    }

    /// Register the callback receiving each hit's relevance score.
    ///
    /// Replaces any earlier registration.
    pub fn score_mapping<F>(mut self, writer: F) -> Self
    where
        F: Fn(&mut T, f32) + Send + Sync + 'static,
    {
        self.result_mapper.register_score_mapping(writer);
        self
    }

    /// Scoring mode chosen at construction.
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Index of `T`.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// The metadata cache this query resolves through.
    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    /// Selected columns in the order they were added.
    pub fn selected_columns(&self) -> &[String] {
        self.source.includes()
    }

    /// Ignored columns in the order they were added.
    pub fn ignored_columns(&self) -> &[String] {
        self.source.excludes()
    }

    /// Sort rules in precedence order.
    pub fn sort_rules(&self) -> &[SortRule] {
        &self.sort
    }

    /// Scoring functions in evaluation order.
    pub fn functions(&self) -> &[ScoringFunction] {
        &self.functions
    }

    /// Current function score policy.
    pub fn combine_policy(&self) -> &CombinePolicy {
        &self.policy
    }

    /// Base filter compiled from the accumulated predicates.
    pub fn base_filter(&self) -> FilterExpression {
        self.filters.to_expression()
    }

    /// Highlight configuration.
    pub fn highlight_builder(&self) -> &HighlightBuilder {
        &self.highlight
    }

    /// Result injection callbacks.
    pub fn result_mapper(&self) -> &HighlightResultMapper<T> {
        &self.result_mapper
    }

    /// Assemble the search request.
    pub fn build_request(&self) -> SearchRequest {
        let route = self
            .route
            .as_deref()
            .map(str::trim)
            .filter(|route| !route.is_empty())
            .map(str::to_string);

        let base = self.base_filter();
        let primary = match self.mode {
            QueryMode::Query => {
                PrimaryClause::Query(compile(&base, &self.functions, &self.policy))
            }
            QueryMode::Filter => PrimaryClause::Filter(base),
        };

        let source = if self.source.is_empty() {
            None
        } else {
            Some(self.source.clone())
        };

        trace!(
            "assembled {:?} request on '{}': {} functions, {} sort rules, {} highlight fields",
            self.mode,
            self.index,
            self.functions.len(),
            self.sort.len(),
            self.highlight.fields().len()
        );

        SearchRequest {
            index: self.index.clone(),
            route,
            primary,
            sort: self.sort.clone(),
            source,
            highlight: self.highlight.clone(),
        }
    }

    /// Assemble the request and hand over the result injection callbacks.
    pub fn into_parts(self) -> (SearchRequest, HighlightResultMapper<T>) {
        let request = self.build_request();
        (request, self.result_mapper)
    }

    fn column_names(&self, properties: &[PropertyRef<T>]) -> Result<Vec<String>> {
        properties
            .iter()
            .map(|property| self.cache.column_name_of(*property))
            .collect()
    }
}

impl<T: Entity> fmt::Debug for DynamicQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicQuery")
            .field("mode", &self.mode)
            .field("index", &self.index)
            .field("route", &self.route)
            .field("filters", &self.filters)
            .field("functions", &self.functions)
            .field("policy", &self.policy)
            .field("sort", &self.sort)
            .field("source", &self.source)
            .field("highlight", &self.highlight)
            .field("result_mapper", &self.result_mapper)
            .finish()
    }
}
