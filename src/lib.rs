//! # Dynamic Query
//!
//! A type-safe, fluent builder for Elasticsearch search requests.
//!
//! ## Features
//!
//! - Typed property handles instead of raw field names
//! - Thread-safe, lazily populated entity metadata cache
//! - Function score assembly (weight, field value factor, random)
//! - Sort rules, source projection and highlighting
//! - Result mapping callbacks for highlighted fragments and scores

pub mod config;
pub mod error;
pub mod query;
pub mod schema;

pub mod prelude {
    pub use crate::config::{HighlightConfig, QueryConfig};
    pub use crate::error::{DynamicQueryError, Result};
    pub use crate::query::{
        BoostMode, DynamicQuery, FilterExpression, FilterGroup, FilterOperator,
        HighlightResultMapper, HitHighlights, QueryMode, ScoreMode, SearchRequest, SortOrder,
    };
    pub use crate::schema::{Entity, EntityCache, EntitySchema, Property, PropertyRef};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
