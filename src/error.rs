//! Error types for the dynamic query library.
//!
//! All errors are represented by the [`DynamicQueryError`] enum. Every chained
//! builder call that touches schema metadata or builds a predicate can fail,
//! and it fails at the call site: nothing is deferred to request assembly.
//!
//! # Examples
//!
//! ```
//! use dynamic_query::error::{DynamicQueryError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(DynamicQueryError::invalid_predicate("value cannot be null"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for dynamic query operations.
#[derive(Error, Debug)]
pub enum DynamicQueryError {
    /// A property could not be mapped to an indexed field of its owner type.
    #[error("Unresolved property: {owner}.{property}")]
    UnresolvedProperty {
        /// Type name of the entity that was expected to own the property.
        owner: String,
        /// Property name that was looked up.
        property: String,
    },

    /// A filter predicate could not be constructed.
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// A scoring function or function score setting has an unusable value.
    #[error("Invalid score: {0}")]
    InvalidScore(String),

    /// Entity schema description errors.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Configuration errors.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors (reading configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with DynamicQueryError.
pub type Result<T> = std::result::Result<T, DynamicQueryError>;

impl DynamicQueryError {
    /// Create a new unresolved property error.
    pub fn unresolved_property<O: Into<String>, P: Into<String>>(owner: O, property: P) -> Self {
        DynamicQueryError::UnresolvedProperty {
            owner: owner.into(),
            property: property.into(),
        }
    }

    /// Create a new invalid predicate error.
    pub fn invalid_predicate<S: Into<String>>(msg: S) -> Self {
        DynamicQueryError::InvalidPredicate(msg.into())
    }

    /// Create a new invalid score error.
    pub fn invalid_score<S: Into<String>>(msg: S) -> Self {
        DynamicQueryError::InvalidScore(msg.into())
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        DynamicQueryError::Schema(msg.into())
    }

    /// Create a new config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        DynamicQueryError::Config(msg.into())
    }
}
