//! Schema module for dynamic queries.
//!
//! This module maps typed entity properties onto the indexed fields of the
//! search backend.

pub mod cache;
pub mod entity;

// Re-export commonly used types
pub use cache::{ColumnInfo, EntityCache, EntityInfo};
pub use entity::{Entity, EntitySchema, EntitySchemaBuilder, Property, PropertyInfo, PropertyRef};
