//! Filter predicates and their translation to the backend query DSL.

use log::warn;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{DynamicQueryError, Result};

/// Comparison operators supported by filter predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Exact term match.
    Equal,
    /// Negated exact term match.
    NotEqual,
    /// Strictly greater than.
    GreaterThan,
    /// Strictly less than.
    LessThan,
    /// Greater than or equal to.
    GreaterThanEqual,
    /// Less than or equal to.
    LessThanEqual,
    /// Full-text match.
    Contains,
    /// Prefix match on the string form of the value.
    StartsWith,
}

impl FilterOperator {
    /// Parse an operator name.
    ///
    /// Names are case-insensitive and may use underscores, dashes or the
    /// symbolic forms (`=`, `!=`, `>`, `<`, `>=`, `<=`). Anything else is
    /// treated as [`FilterOperator::Equal`].
    pub fn parse(name: &str) -> Self {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "equal" | "eq" | "=" | "==" => FilterOperator::Equal,
            "notequal" | "ne" | "!=" | "<>" => FilterOperator::NotEqual,
            "greaterthan" | "gt" | ">" => FilterOperator::GreaterThan,
            "lessthan" | "lt" | "<" => FilterOperator::LessThan,
            "greaterthanequal" | "gte" | ">=" => FilterOperator::GreaterThanEqual,
            "lessthanequal" | "lte" | "<=" => FilterOperator::LessThanEqual,
            "contains" | "match" => FilterOperator::Contains,
            "startswith" | "prefix" => FilterOperator::StartsWith,
            _ => {
                warn!("unknown filter operator '{name}', falling back to EQUAL");
                FilterOperator::Equal
            }
        }
    }
}

/// Bound kind of a range comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    /// Exclusive lower bound.
    Gt,
    /// Inclusive lower bound.
    Gte,
    /// Exclusive upper bound.
    Lt,
    /// Inclusive upper bound.
    Lte,
}

impl RangeBound {
    /// Key of this bound in a range query.
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeBound::Gt => "gt",
            RangeBound::Gte => "gte",
            RangeBound::Lt => "lt",
            RangeBound::Lte => "lte",
        }
    }
}

/// A filter expression in the backend's query DSL.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// Matches every document.
    MatchAll,
    /// Exact value match.
    Term { field: String, value: Value },
    /// One-sided range comparison.
    Range {
        field: String,
        bound: RangeBound,
        value: Value,
    },
    /// Analyzed full-text match.
    Match { field: String, query: Value },
    /// Prefix match.
    Prefix { field: String, value: String },
    /// Boolean combination of expressions.
    Bool {
        must: Vec<FilterExpression>,
        should: Vec<FilterExpression>,
        must_not: Vec<FilterExpression>,
        filter: Vec<FilterExpression>,
    },
}

impl FilterExpression {
    /// Negate an expression.
    pub fn not(expression: FilterExpression) -> Self {
        FilterExpression::Bool {
            must: Vec::new(),
            should: Vec::new(),
            must_not: vec![expression],
            filter: Vec::new(),
        }
    }

    /// Wrap an expression in a non-scoring filter context.
    pub fn non_scoring(expression: FilterExpression) -> Self {
        FilterExpression::Bool {
            must: Vec::new(),
            should: Vec::new(),
            must_not: Vec::new(),
            filter: vec![expression],
        }
    }

    /// Field this expression targets, if it targets exactly one.
    pub fn field(&self) -> Option<&str> {
        match self {
            FilterExpression::Term { field, .. }
            | FilterExpression::Range { field, .. }
            | FilterExpression::Match { field, .. }
            | FilterExpression::Prefix { field, .. } => Some(field),
            FilterExpression::MatchAll | FilterExpression::Bool { .. } => None,
        }
    }

    /// Render this expression as a query DSL document.
    pub fn to_json(&self) -> Value {
        match self {
            FilterExpression::MatchAll => json!({ "match_all": {} }),
            FilterExpression::Term { field, value } => json!({
                "term": { field.clone(): { "value": value } }
            }),
            FilterExpression::Range {
                field,
                bound,
                value,
            } => json!({
                "range": { field.clone(): { bound.as_str(): value } }
            }),
            FilterExpression::Match { field, query } => json!({
                "match": { field.clone(): { "query": query } }
            }),
            FilterExpression::Prefix { field, value } => json!({
                "prefix": { field.clone(): { "value": value } }
            }),
            FilterExpression::Bool {
                must,
                should,
                must_not,
                filter,
            } => {
                let mut clauses = serde_json::Map::new();
                for (key, expressions) in [
                    ("must", must),
                    ("should", should),
                    ("must_not", must_not),
                    ("filter", filter),
                ] {
                    if !expressions.is_empty() {
                        let rendered = expressions.iter().map(Self::to_json).collect();
                        clauses.insert(key.to_string(), Value::Array(rendered));
                    }
                }
                json!({ "bool": clauses })
            }
        }
    }
}

/// Translate a `(field, operator, value)` triple into a filter expression.
///
/// The value is passed through untouched; type mismatches surface when the
/// backend evaluates the query.
pub fn build_predicate<S: Into<String>>(
    field: S,
    operator: FilterOperator,
    value: Value,
) -> Result<FilterExpression> {
    let field = field.into();
    if field.is_empty() {
        return Err(DynamicQueryError::invalid_predicate(
            "field name cannot be empty",
        ));
    }
    if value.is_null() {
        return Err(DynamicQueryError::invalid_predicate(format!(
            "value for field '{field}' cannot be null"
        )));
    }

    let expression = match operator {
        FilterOperator::Equal => FilterExpression::Term { field, value },
        FilterOperator::NotEqual => FilterExpression::not(FilterExpression::Term { field, value }),
        FilterOperator::GreaterThan => range(field, RangeBound::Gt, value),
        FilterOperator::GreaterThanEqual => range(field, RangeBound::Gte, value),
        FilterOperator::LessThan => range(field, RangeBound::Lt, value),
        FilterOperator::LessThanEqual => range(field, RangeBound::Lte, value),
        FilterOperator::Contains => FilterExpression::Match {
            field,
            query: value,
        },
        FilterOperator::StartsWith => FilterExpression::Prefix {
            field,
            value: value_as_string(value),
        },
    };

    Ok(expression)
}

/// Serialize a typed value and translate it into a filter expression.
pub fn build_typed_predicate<S: Into<String>, V: Serialize>(
    field: S,
    operator: FilterOperator,
    value: &V,
) -> Result<FilterExpression> {
    let value = serde_json::to_value(value)
        .map_err(|e| DynamicQueryError::invalid_predicate(format!("unserializable value: {e}")))?;
    build_predicate(field, operator, value)
}

fn range(field: String, bound: RangeBound, value: Value) -> FilterExpression {
    FilterExpression::Range {
        field,
        bound,
        value,
    }
}

fn value_as_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Accumulates AND / OR predicates into the base filter of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGroup {
    must: Vec<FilterExpression>,
    should: Vec<FilterExpression>,
}

impl FilterGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate every document has to satisfy.
    pub fn add_and(&mut self, expression: FilterExpression) {
        self.must.push(expression);
    }

    /// Add a predicate at least one of which has to be satisfied.
    pub fn add_or(&mut self, expression: FilterExpression) {
        self.should.push(expression);
    }

    /// Check whether nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty()
    }

    /// Compile the group into a single expression.
    ///
    /// An empty group matches everything and a lone AND predicate stands
    /// for itself.
    pub fn to_expression(&self) -> FilterExpression {
        let any_of = |should: &[FilterExpression]| FilterExpression::Bool {
            must: Vec::new(),
            should: should.to_vec(),
            must_not: Vec::new(),
            filter: Vec::new(),
        };

        match (self.must.as_slice(), self.should.as_slice()) {
            ([], []) => FilterExpression::MatchAll,
            ([single], []) => single.clone(),
            ([], should) => any_of(should),
            (must, []) => FilterExpression::Bool {
                must: must.to_vec(),
                should: Vec::new(),
                must_not: Vec::new(),
                filter: Vec::new(),
            },
            // should next to must would turn the OR part optional
            (must, should) => {
                let mut all = must.to_vec();
                all.push(any_of(should));
                FilterExpression::Bool {
                    must: all,
                    should: Vec::new(),
                    must_not: Vec::new(),
                    filter: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse() {
        assert_eq!(FilterOperator::parse("NOT_EQUAL"), FilterOperator::NotEqual);
        assert_eq!(FilterOperator::parse("not-equal"), FilterOperator::NotEqual);
        assert_eq!(FilterOperator::parse(">="), FilterOperator::GreaterThanEqual);
        assert_eq!(FilterOperator::parse("startsWith"), FilterOperator::StartsWith);
        assert_eq!(FilterOperator::parse("contains"), FilterOperator::Contains);
    }

    #[test]
    fn test_unknown_operator_falls_back_to_equal() {
        assert_eq!(FilterOperator::parse("between"), FilterOperator::Equal);
        assert_eq!(FilterOperator::parse(""), FilterOperator::Equal);
    }

    #[test]
    fn test_parsed_operator_builds_predicate() {
        let operator = FilterOperator::parse("GREATER_THAN_EQUAL");
        let expr = build_predicate("stock", operator, json!(5)).unwrap();
        assert_eq!(expr.to_json(), json!({ "range": { "stock": { "gte": 5 } } }));

        let fallback = FilterOperator::parse("LIKE");
        let expr = build_predicate("stock", fallback, json!(5)).unwrap();
        assert_eq!(expr.to_json(), json!({ "term": { "stock": { "value": 5 } } }));
    }

    #[test]
    fn test_equal_is_term() {
        let expr = build_predicate("status", FilterOperator::Equal, json!("active")).unwrap();

        assert_eq!(
            expr.to_json(),
            json!({ "term": { "status": { "value": "active" } } })
        );
    }

    #[test]
    fn test_not_equal_is_negated_term() {
        let expr = build_predicate("age", FilterOperator::NotEqual, json!(30)).unwrap();

        assert_eq!(
            expr,
            FilterExpression::not(FilterExpression::Term {
                field: "age".to_string(),
                value: json!(30),
            })
        );
        assert_eq!(
            expr.to_json(),
            json!({ "bool": { "must_not": [ { "term": { "age": { "value": 30 } } } ] } })
        );
    }

    #[test]
    fn test_range_operators() {
        let cases = [
            (FilterOperator::GreaterThan, "gt"),
            (FilterOperator::GreaterThanEqual, "gte"),
            (FilterOperator::LessThan, "lt"),
            (FilterOperator::LessThanEqual, "lte"),
        ];

        for (operator, key) in cases {
            let expr = build_predicate("price", operator, json!(9.5)).unwrap();
            assert_eq!(expr.to_json(), json!({ "range": { "price": { key: 9.5 } } }));
        }
    }

    #[test]
    fn test_contains_is_match() {
        let expr = build_predicate("title", FilterOperator::Contains, json!("rust book")).unwrap();

        assert_eq!(
            expr.to_json(),
            json!({ "match": { "title": { "query": "rust book" } } })
        );
    }

    #[test]
    fn test_starts_with_uses_string_form() {
        let expr = build_predicate("sku", FilterOperator::StartsWith, json!("AB-")).unwrap();
        assert_eq!(
            expr.to_json(),
            json!({ "prefix": { "sku": { "value": "AB-" } } })
        );

        let expr = build_predicate("code", FilterOperator::StartsWith, json!(42)).unwrap();
        assert_eq!(
            expr,
            FilterExpression::Prefix {
                field: "code".to_string(),
                value: "42".to_string(),
            }
        );
    }

    #[test]
    fn test_null_value_is_invalid() {
        let result = build_predicate("status", FilterOperator::Equal, Value::Null);
        assert!(matches!(result, Err(DynamicQueryError::InvalidPredicate(_))));

        let missing: Option<String> = None;
        let result = build_typed_predicate("status", FilterOperator::Equal, &missing);
        assert!(matches!(result, Err(DynamicQueryError::InvalidPredicate(_))));
    }

    #[test]
    fn test_empty_field_is_invalid() {
        let result = build_predicate("", FilterOperator::Equal, json!(1));
        assert!(matches!(result, Err(DynamicQueryError::InvalidPredicate(_))));
    }

    #[test]
    fn test_value_type_is_not_checked() {
        let expr = build_predicate("age", FilterOperator::GreaterThan, json!("thirty")).unwrap();
        assert_eq!(expr.field(), Some("age"));
    }

    #[test]
    fn test_filter_group() {
        let mut group = FilterGroup::new();
        assert!(group.is_empty());
        assert_eq!(group.to_expression(), FilterExpression::MatchAll);

        let status = build_predicate("status", FilterOperator::Equal, json!("active")).unwrap();
        group.add_and(status.clone());
        assert_eq!(group.to_expression(), status);

        let cheap = build_predicate("price", FilterOperator::LessThan, json!(10)).unwrap();
        let new = build_predicate("tag", FilterOperator::Equal, json!("new")).unwrap();
        group.add_or(cheap.clone());
        group.add_or(new.clone());

        assert_eq!(
            group.to_expression().to_json(),
            json!({
                "bool": {
                    "must": [
                        status.to_json(),
                        { "bool": { "should": [ cheap.to_json(), new.to_json() ] } }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_or_only_group() {
        let mut group = FilterGroup::new();
        let a = build_predicate("tag", FilterOperator::Equal, json!("a")).unwrap();
        let b = build_predicate("tag", FilterOperator::Equal, json!("b")).unwrap();
        group.add_or(a.clone());
        group.add_or(b.clone());

        assert_eq!(
            group.to_expression().to_json(),
            json!({ "bool": { "should": [ a.to_json(), b.to_json() ] } })
        );
    }
}
