//! Query building.
//!
//! Leaf modules translate predicates, scoring functions, sort rules,
//! projections and highlight settings into the backend's query DSL;
//! [`dynamic`] ties them together behind the typed builder.

pub mod dynamic;
pub mod filter;
pub mod function_score;
pub mod highlight;
pub mod request;
pub mod sort;
pub mod source;

pub use self::dynamic::{DynamicQuery, QueryMode};
pub use self::filter::{
    FilterExpression, FilterGroup, FilterOperator, RangeBound, build_predicate,
    build_typed_predicate,
};
pub use self::function_score::{
    BoostMode, CombinePolicy, FilterFunction, FunctionScoreQuery, QueryClause, ScoreFunction,
    ScoreMode, ScoringFunction, compile,
};
pub use self::highlight::{HighlightBuilder, HighlightResultMapper, HitHighlights, HitMapping};
pub use self::request::{PrimaryClause, SearchRequest};
pub use self::sort::{SortOrder, SortRule};
pub use self::source::SourceFilter;
