//! Function score assembly.
//!
//! Scoring functions accumulate in call order and are compiled, together with
//! a [`CombinePolicy`], into a single `function_score` query layered over the
//! base filter. An empty function list compiles to the base filter itself:
//! wrapping zero functions would change how the backend scores documents.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{DynamicQueryError, Result};
use crate::query::filter::FilterExpression;

/// How the base relevance score and the function score are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostMode {
    /// Query score times function score.
    #[default]
    Multiply,
    /// Query score plus function score.
    Sum,
    /// Average of query score and function score.
    Avg,
    /// Larger of query score and function score.
    Max,
    /// Smaller of query score and function score.
    Min,
    /// Function score only; the query score is ignored.
    Replace,
}

impl BoostMode {
    /// Name of this mode in the query DSL.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoostMode::Multiply => "multiply",
            BoostMode::Sum => "sum",
            BoostMode::Avg => "avg",
            BoostMode::Max => "max",
            BoostMode::Min => "min",
            BoostMode::Replace => "replace",
        }
    }

    /// Parse a mode name, falling back to [`BoostMode::Multiply`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "multiply" => BoostMode::Multiply,
            "sum" => BoostMode::Sum,
            "avg" => BoostMode::Avg,
            "max" => BoostMode::Max,
            "min" => BoostMode::Min,
            "replace" => BoostMode::Replace,
            _ => {
                warn!("unknown boost mode '{name}', falling back to multiply");
                BoostMode::Multiply
            }
        }
    }
}

/// How the scores of several functions are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    /// Product of all matching function scores.
    #[default]
    Multiply,
    /// Sum of all matching function scores.
    Sum,
    /// Average of all matching function scores.
    Avg,
    /// Largest matching function score.
    Max,
    /// Smallest matching function score.
    Min,
    /// Score of the first function whose filter matches.
    First,
}

impl ScoreMode {
    /// Name of this mode in the query DSL.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Multiply => "multiply",
            ScoreMode::Sum => "sum",
            ScoreMode::Avg => "avg",
            ScoreMode::Max => "max",
            ScoreMode::Min => "min",
            ScoreMode::First => "first",
        }
    }

    /// Parse a mode name, falling back to [`ScoreMode::Multiply`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "multiply" => ScoreMode::Multiply,
            "sum" => ScoreMode::Sum,
            "avg" => ScoreMode::Avg,
            "max" => ScoreMode::Max,
            "min" => ScoreMode::Min,
            "first" => ScoreMode::First,
            _ => {
                warn!("unknown score mode '{name}', falling back to multiply");
                ScoreMode::Multiply
            }
        }
    }
}

/// Combination policy of a function score query.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinePolicy {
    /// How the query score and the function score combine.
    pub boost_mode: BoostMode,
    /// How function scores aggregate among themselves.
    pub score_mode: ScoreMode,
    /// Upper cap of the function score; `None` means uncapped.
    pub max_boost: Option<f32>,
}

impl CombinePolicy {
    /// Check that `max_boost` is a usable cap.
    ///
    /// A cap has to be finite and non-negative; anything else cannot be
    /// rendered as a number the backend accepts.
    pub fn check_max_boost(max_boost: f32) -> Result<f32> {
        if max_boost.is_finite() && max_boost >= 0.0 {
            Ok(max_boost)
        } else {
            Err(DynamicQueryError::invalid_score(format!(
                "max_boost must be a non-negative number, got {max_boost}"
            )))
        }
    }
}

/// A scoring function.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreFunction {
    /// Constant weight.
    Weight(f32),
    /// Numeric document field multiplied by a factor.
    FieldValueFactor { field: String, factor: f32 },
    /// Uniformly distributed random score.
    Random,
}

impl ScoreFunction {
    /// A constant weight, rejecting NaN and infinities.
    pub fn weight(weight: f32) -> Result<Self> {
        Ok(ScoreFunction::Weight(check_finite("weight", weight)?))
    }

    /// A field value factor, rejecting NaN and infinite factors.
    pub fn field_value_factor<S: Into<String>>(field: S, factor: f32) -> Result<Self> {
        Ok(ScoreFunction::FieldValueFactor {
            field: field.into(),
            factor: check_finite("factor", factor)?,
        })
    }

    fn write_json(&self, target: &mut Map<String, Value>) {
        match self {
            ScoreFunction::Weight(weight) => {
                target.insert("weight".to_string(), json!(weight));
            }
            ScoreFunction::FieldValueFactor { field, factor } => {
                target.insert(
                    "field_value_factor".to_string(),
                    json!({ "field": field, "factor": factor }),
                );
            }
            ScoreFunction::Random => {
                target.insert("random_score".to_string(), json!({}));
            }
        }
    }
}

fn check_finite(name: &str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DynamicQueryError::invalid_score(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

/// A scoring function, optionally gated by a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringFunction {
    /// Documents the function applies to; `None` applies it to all.
    pub filter: Option<FilterExpression>,
    /// The function itself.
    pub function: ScoreFunction,
}

impl ScoringFunction {
    /// An unconditional scoring function.
    pub fn new(function: ScoreFunction) -> Self {
        ScoringFunction {
            filter: None,
            function,
        }
    }

    /// A scoring function that only applies to documents matching `filter`.
    pub fn filtered(filter: FilterExpression, function: ScoreFunction) -> Self {
        ScoringFunction {
            filter: Some(filter),
            function,
        }
    }
}

/// A compiled filter/function pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterFunction {
    /// Gate of the function; [`FilterExpression::MatchAll`] when unconditional.
    pub filter: FilterExpression,
    /// The function.
    pub function: ScoreFunction,
}

impl FilterFunction {
    /// Render this pair as a query DSL document.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("filter".to_string(), self.filter.to_json());
        self.function.write_json(&mut object);
        Value::Object(object)
    }
}

/// A composite scoring query.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionScoreQuery {
    /// Base query.
    pub query: FilterExpression,
    /// Filter/function pairs in evaluation order.
    pub functions: Vec<FilterFunction>,
    /// Combination policy.
    pub policy: CombinePolicy,
}

impl FunctionScoreQuery {
    /// Render this query as a query DSL document.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.to_json());
        body.insert(
            "functions".to_string(),
            Value::Array(self.functions.iter().map(FilterFunction::to_json).collect()),
        );
        body.insert(
            "boost_mode".to_string(),
            json!(self.policy.boost_mode.as_str()),
        );
        body.insert(
            "score_mode".to_string(),
            json!(self.policy.score_mode.as_str()),
        );
        if let Some(max_boost) = self.policy.max_boost {
            body.insert("max_boost".to_string(), json!(max_boost));
        }
        json!({ "function_score": body })
    }
}

/// A scoring query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryClause {
    /// Base filter with native relevance scoring.
    Filter(FilterExpression),
    /// Base filter wrapped in a function score query.
    FunctionScore(FunctionScoreQuery),
}

impl QueryClause {
    /// Render this clause as a query DSL document.
    pub fn to_json(&self) -> Value {
        match self {
            QueryClause::Filter(expression) => expression.to_json(),
            QueryClause::FunctionScore(query) => query.to_json(),
        }
    }
}

/// Compile a base filter and scoring functions into one scoring clause.
///
/// Pure: the inputs are only read.
pub fn compile(
    base: &FilterExpression,
    functions: &[ScoringFunction],
    policy: &CombinePolicy,
) -> QueryClause {
    if functions.is_empty() {
        return QueryClause::Filter(base.clone());
    }

    let functions = functions
        .iter()
        .map(|scoring| FilterFunction {
            filter: scoring
                .filter
                .clone()
                .unwrap_or(FilterExpression::MatchAll),
            function: scoring.function.clone(),
        })
        .collect();

    QueryClause::FunctionScore(FunctionScoreQuery {
        query: base.clone(),
        functions,
        policy: *policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::{FilterOperator, build_predicate};

    fn status_active() -> FilterExpression {
        build_predicate("status", FilterOperator::Equal, json!("active")).unwrap()
    }

    #[test]
    fn test_empty_functions_yield_base_filter() {
        let base = status_active();
        let clause = compile(&base, &[], &CombinePolicy::default());

        assert_eq!(clause, QueryClause::Filter(base.clone()));
        assert_eq!(clause.to_json(), base.to_json());
    }

    #[test]
    fn test_function_order_is_preserved() {
        let functions = vec![
            ScoringFunction::new(ScoreFunction::Weight(2.0)),
            ScoringFunction::new(ScoreFunction::Random),
        ];

        match compile(&status_active(), &functions, &CombinePolicy::default()) {
            QueryClause::FunctionScore(query) => {
                assert_eq!(query.functions.len(), 2);
                assert_eq!(query.functions[0].function, ScoreFunction::Weight(2.0));
                assert_eq!(query.functions[1].function, ScoreFunction::Random);
                assert!(
                    query
                        .functions
                        .iter()
                        .all(|f| f.filter == FilterExpression::MatchAll)
                );
            }
            other => panic!("Expected function score, got {other:?}"),
        }
        assert_eq!(functions.len(), 2);
    }

    #[test]
    fn test_function_score_json() {
        let gate = build_predicate("stock", FilterOperator::GreaterThan, json!(0)).unwrap();
        let functions = vec![
            ScoringFunction::filtered(gate.clone(), ScoreFunction::Weight(3.0)),
            ScoringFunction::new(ScoreFunction::FieldValueFactor {
                field: "popularity".to_string(),
                factor: 1.5,
            }),
        ];
        let policy = CombinePolicy {
            boost_mode: BoostMode::Sum,
            score_mode: ScoreMode::Max,
            max_boost: Some(10.0),
        };

        let json = compile(&status_active(), &functions, &policy).to_json();

        assert_eq!(
            json,
            json!({
                "function_score": {
                    "query": status_active().to_json(),
                    "functions": [
                        { "filter": gate.to_json(), "weight": 3.0 },
                        {
                            "filter": { "match_all": {} },
                            "field_value_factor": { "field": "popularity", "factor": 1.5 }
                        }
                    ],
                    "boost_mode": "sum",
                    "score_mode": "max",
                    "max_boost": 10.0
                }
            })
        );
    }

    #[test]
    fn test_max_boost_absent_unless_set() {
        let functions = vec![ScoringFunction::new(ScoreFunction::Random)];

        let uncapped = compile(&status_active(), &functions, &CombinePolicy::default()).to_json();
        assert!(uncapped["function_score"].get("max_boost").is_none());
        assert_eq!(
            uncapped["function_score"]["functions"][0]["random_score"],
            json!({})
        );

        let policy = CombinePolicy {
            max_boost: Some(0.0),
            ..CombinePolicy::default()
        };
        let capped = compile(&status_active(), &functions, &policy).to_json();
        assert_eq!(capped["function_score"]["max_boost"], json!(0.0));
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        assert_eq!(ScoreFunction::weight(2.5).unwrap(), ScoreFunction::Weight(2.5));
        assert!(matches!(
            ScoreFunction::weight(f32::NAN),
            Err(DynamicQueryError::InvalidScore(_))
        ));
        assert!(ScoreFunction::weight(-1.0).is_ok());
        assert!(ScoreFunction::field_value_factor("popularity", f32::INFINITY).is_err());

        assert_eq!(CombinePolicy::check_max_boost(0.0).unwrap(), 0.0);
        assert!(CombinePolicy::check_max_boost(-1.0).is_err());
        assert!(CombinePolicy::check_max_boost(f32::NAN).is_err());
        assert!(CombinePolicy::check_max_boost(f32::INFINITY).is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(BoostMode::parse("REPLACE"), BoostMode::Replace);
        assert_eq!(BoostMode::parse("unknown"), BoostMode::Multiply);
        assert_eq!(ScoreMode::parse("first"), ScoreMode::First);
        assert_eq!(ScoreMode::parse(""), ScoreMode::Multiply);
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(
            serde_json::to_value(BoostMode::Replace).unwrap(),
            json!("replace")
        );
        assert_eq!(
            serde_json::from_value::<ScoreMode>(json!("first")).unwrap(),
            ScoreMode::First
        );
    }
}
