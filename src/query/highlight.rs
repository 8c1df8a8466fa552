//! Highlight configuration and result mapping registries.
//!
//! [`HighlightBuilder`] is the part that goes on the wire. [`HighlightResultMapper`]
//! stays with the caller: after the search runs, a result mapper walks each
//! hit and hands the highlighted fragments and the relevance score to the
//! callbacks registered here.

use std::fmt;

use ahash::AHashMap;
use serde_json::{Map, Value, json};

use crate::config::HighlightConfig;

/// Fields to highlight plus presentation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightBuilder {
    fields: Vec<String>,
    config: HighlightConfig,
}

impl HighlightBuilder {
    /// Create a builder with no fields and backend default presentation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with the given presentation settings.
    pub fn with_config(config: HighlightConfig) -> Self {
        HighlightBuilder {
            fields: Vec::new(),
            config,
        }
    }

    /// Append a field. The same field may be added more than once.
    pub fn field<S: Into<String>>(&mut self, field: S) {
        self.fields.push(field.into());
    }

    /// Highlighted fields in registration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Presentation settings.
    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Check whether no field is highlighted.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as a `highlight` document.
    ///
    /// Fields use the explicit-order array form so order and duplicates are
    /// kept as registered.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        if !self.config.pre_tags.is_empty() {
            body.insert("pre_tags".to_string(), json!(self.config.pre_tags));
        }
        if !self.config.post_tags.is_empty() {
            body.insert("post_tags".to_string(), json!(self.config.post_tags));
        }
        if let Some(size) = self.config.fragment_size {
            body.insert("fragment_size".to_string(), json!(size));
        }
        if let Some(count) = self.config.number_of_fragments {
            body.insert("number_of_fragments".to_string(), json!(count));
        }
        let fields = self
            .fields
            .iter()
            .map(|field| json!({ field.clone(): {} }))
            .collect();
        body.insert("fields".to_string(), Value::Array(fields));
        Value::Object(body)
    }
}

/// Callback writing a highlighted fragment into a result object.
pub type HighlightWriter<T> = Box<dyn Fn(&mut T, &str) + Send + Sync>;

/// Callback writing the relevance score into a result object.
pub type ScoreWriter<T> = Box<dyn Fn(&mut T, f32) + Send + Sync>;

/// A highlighted field and the callback that receives its fragment.
pub struct HitMapping<T> {
    field: String,
    writer: HighlightWriter<T>,
}

impl<T> HitMapping<T> {
    /// Field whose fragments this mapping receives.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Hand a fragment to the callback.
    pub fn write(&self, target: &mut T, fragment: &str) {
        (self.writer)(target, fragment)
    }
}

impl<T> fmt::Debug for HitMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitMapping")
            .field("field", &self.field)
            .finish_non_exhaustive()
    }
}

/// The parts of a search hit a result mapper needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitHighlights {
    /// Relevance score of the hit.
    pub score: f32,
    /// Highlighted fragments by field name.
    pub fragments: AHashMap<String, Vec<String>>,
}

impl HitHighlights {
    /// Create a hit view with no fragments.
    pub fn new(score: f32) -> Self {
        HitHighlights {
            score,
            fragments: AHashMap::new(),
        }
    }

    /// Add fragments for a field.
    pub fn with_fragments<S, I, F>(mut self, field: S, fragments: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.fragments
            .entry(field.into())
            .or_default()
            .extend(fragments.into_iter().map(Into::into));
        self
    }
}

/// Registry of result injection callbacks for entity `T`.
pub struct HighlightResultMapper<T> {
    hit_mappings: Vec<HitMapping<T>>,
    score_writer: Option<ScoreWriter<T>>,
}

impl<T> HighlightResultMapper<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        HighlightResultMapper {
            hit_mappings: Vec::new(),
            score_writer: None,
        }
    }

    /// Register a fragment callback for a field.
    pub fn register_hit_mapping<S, F>(&mut self, field: S, writer: F)
    where
        S: Into<String>,
        F: Fn(&mut T, &str) + Send + Sync + 'static,
    {
        self.hit_mappings.push(HitMapping {
            field: field.into(),
            writer: Box::new(writer),
        });
    }

    /// Register the score callback, replacing any earlier one.
    pub fn register_score_mapping<F>(&mut self, writer: F)
    where
        F: Fn(&mut T, f32) + Send + Sync + 'static,
    {
        self.score_writer = Some(Box::new(writer));
    }

    /// Fragment callbacks in registration order.
    pub fn hit_mappings(&self) -> &[HitMapping<T>] {
        &self.hit_mappings
    }

    /// Check whether a score callback is registered.
    pub fn has_score_mapping(&self) -> bool {
        self.score_writer.is_some()
    }

    /// Hand a score to the score callback, if any.
    pub fn write_score(&self, target: &mut T, score: f32) {
        if let Some(writer) = &self.score_writer {
            writer(target, score);
        }
    }

    /// Apply every registered callback to one hit.
    ///
    /// Each fragment callback whose field has fragments runs once, with the
    /// fragments joined together.
    pub fn apply(&self, target: &mut T, hit: &HitHighlights) {
        self.write_score(target, hit.score);
        for mapping in &self.hit_mappings {
            if let Some(fragments) = hit.fragments.get(mapping.field())
                && !fragments.is_empty()
            {
                mapping.write(target, &fragments.concat());
            }
        }
    }
}

impl<T> Default for HighlightResultMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HighlightResultMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightResultMapper")
            .field("hit_mappings", &self.hit_mappings)
            .field("score_mapping", &self.score_writer.is_some())
            .finish()
    }
}
