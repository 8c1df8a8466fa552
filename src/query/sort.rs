//! Sort rules.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Name of this order in the query DSL.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One ordering rule of a search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortRule {
    /// Order by relevance score.
    Score(SortOrder),
    /// Order by an indexed field.
    Field { field: String, order: SortOrder },
}

impl SortRule {
    /// Order by an indexed field.
    pub fn field<S: Into<String>>(field: S, order: SortOrder) -> Self {
        SortRule::Field {
            field: field.into(),
            order,
        }
    }

    /// Direction of this rule.
    pub fn order(&self) -> SortOrder {
        match self {
            SortRule::Score(order) | SortRule::Field { order, .. } => *order,
        }
    }

    /// Render this rule as a query DSL document.
    pub fn to_json(&self) -> Value {
        match self {
            SortRule::Score(order) => json!({ "_score": { "order": order.as_str() } }),
            SortRule::Field { field, order } => json!({
                field.clone(): { "order": order.as_str() }
            }),
        }
    }
}
