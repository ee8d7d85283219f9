//! Indexing strategies.
//!
//! A strategy turns a content item into the field map of a search document,
//! or returns `None` when the item should not be indexed after all (for
//! example it was unpublished between enqueue and processing).
//!
//! Strategies are looked up by the `strategy_name` of an index definition.
//! [`FieldExtractorStrategy`] covers the common case with an explicit,
//! ordered list of `(field name, extractor)` pairs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use sync_search::DocumentFields;
use sync_types::{ContentItem, IndexDefinition};

use crate::error::IndexingError;

/// Name under which [`StrategyRegistry::with_default`] registers the default strategy.
pub const DEFAULT_STRATEGY: &str = "default";

/// Maps content items to search documents for one kind of index.
#[async_trait]
pub trait IndexingStrategy: Send + Sync {
    /// Build the document fields for `item`, or `None` to skip it.
    async fn map_to_document(
        &self,
        item: &ContentItem,
        index: &IndexDefinition,
    ) -> Result<Option<DocumentFields>, IndexingError>;

    /// Get the name of this strategy for logging.
    fn name(&self) -> &str;
}

type ExtractFn = dyn Fn(&ContentItem) -> Option<serde_json::Value> + Send + Sync;
type QualifyFn = dyn Fn(&ContentItem) -> bool + Send + Sync;

/// One output field and the function computing it.
#[derive(Clone)]
pub struct FieldExtractor {
    name: String,
    extract: Arc<ExtractFn>,
}

impl FieldExtractor {
    pub fn new<F>(name: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&ContentItem) -> Option<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            extract: Arc::new(extract),
        }
    }

    /// Copy a property from the item snapshot, if present.
    pub fn property(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.clone();
        Self::new(name, move |item| item.properties.get(&key).cloned())
    }

    /// Copy a property under a different output name.
    pub fn renamed(output: impl Into<String>, property: impl Into<String>) -> Self {
        let key = property.into();
        Self::new(output, move |item| item.properties.get(&key).cloned())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for FieldExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldExtractor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Strategy built from an ordered list of field extractors.
///
/// Extractors returning `None` leave their field out. An optional
/// qualification predicate rejects items outright.
pub struct FieldExtractorStrategy {
    name: String,
    extractors: Vec<FieldExtractor>,
    qualifies: Option<Arc<QualifyFn>>,
}

impl FieldExtractorStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extractors: Vec::new(),
            qualifies: None,
        }
    }

    /// Append an extractor. Later extractors overwrite earlier fields of the same name.
    pub fn with_field(mut self, extractor: FieldExtractor) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Only index items for which `predicate` holds.
    pub fn with_qualifier<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ContentItem) -> bool + Send + Sync + 'static,
    {
        self.qualifies = Some(Arc::new(predicate));
        self
    }

    /// Extractors in evaluation order.
    pub fn fields(&self) -> &[FieldExtractor] {
        &self.extractors
    }

    /// Identity fields common to every document.
    pub fn with_identity_fields(self) -> Self {
        self.with_field(FieldExtractor::new("item_id", |item| {
            Some(item.item_id.into())
        }))
        .with_field(FieldExtractor::new("guid", |item| {
            Some(item.guid.to_string().into())
        }))
        .with_field(FieldExtractor::new("content_type", |item| {
            Some(item.content_type.clone().into())
        }))
        .with_field(FieldExtractor::new("language", |item| {
            Some(item.language.clone().into())
        }))
        .with_field(FieldExtractor::new("tree_path", |item| {
            item.tree_path.clone().map(Into::into)
        }))
    }

    fn extract(&self, item: &ContentItem) -> DocumentFields {
        let mut fields = DocumentFields::new();
        for extractor in &self.extractors {
            if let Some(value) = (extractor.extract)(item) {
                fields.insert(extractor.name.clone(), value);
            }
        }
        fields
    }
}

#[async_trait]
impl IndexingStrategy for FieldExtractorStrategy {
    async fn map_to_document(
        &self,
        item: &ContentItem,
        _index: &IndexDefinition,
    ) -> Result<Option<DocumentFields>, IndexingError> {
        if let Some(qualifies) = &self.qualifies {
            if !qualifies(item) {
                return Ok(None);
            }
        }
        Ok(Some(self.extract(item)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Default strategy: identity fields plus every property in the item snapshot.
///
/// Items whose snapshot carries `"published": false` are skipped.
pub struct DefaultStrategy {
    identity: FieldExtractorStrategy,
}

impl DefaultStrategy {
    pub fn new() -> Self {
        Self {
            identity: FieldExtractorStrategy::new(DEFAULT_STRATEGY).with_identity_fields(),
        }
    }
}

impl Default for DefaultStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexingStrategy for DefaultStrategy {
    async fn map_to_document(
        &self,
        item: &ContentItem,
        _index: &IndexDefinition,
    ) -> Result<Option<DocumentFields>, IndexingError> {
        if item.properties.get("published") == Some(&serde_json::Value::Bool(false)) {
            return Ok(None);
        }
        let mut fields = item.properties.clone();
        // Identity fields take precedence over same-named properties
        fields.extend(self.identity.extract(item));
        Ok(Some(fields))
    }

    fn name(&self) -> &str {
        DEFAULT_STRATEGY
    }
}

/// Strategies by name (case-insensitive).
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn IndexingStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing only [`DefaultStrategy`] under [`DEFAULT_STRATEGY`].
    pub fn with_default() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_STRATEGY, Arc::new(DefaultStrategy::new()));
        registry
    }

    /// Register (or replace) a strategy.
    pub fn register(&mut self, name: &str, strategy: Arc<dyn IndexingStrategy>) {
        self.strategies.insert(name.to_lowercase(), strategy);
    }

    /// Look up a strategy.
    pub fn get(&self, name: &str) -> Result<Arc<dyn IndexingStrategy>, IndexingError> {
        self.strategies
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| IndexingError::UnknownStrategy(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> IndexDefinition {
        IndexDefinition::new(1, "Products").with_language("en")
    }

    fn coffee() -> ContentItem {
        ContentItem::page(42, "Product", "en", "/Products/Coffee")
            .with_property("title", "Coffee")
            .with_property("price", 12)
    }

    #[tokio::test]
    async fn test_field_extractor_strategy() {
        let strategy = FieldExtractorStrategy::new("products")
            .with_field(FieldExtractor::property("title"))
            .with_field(FieldExtractor::renamed("cost", "price"))
            .with_field(FieldExtractor::property("missing"))
            .with_field(FieldExtractor::new("url", |item| {
                item.tree_path.as_ref().map(|p| json!(p.to_lowercase()))
            }));

        let fields = strategy
            .map_to_document(&coffee(), &index())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fields.get("title"), Some(&json!("Coffee")));
        assert_eq!(fields.get("cost"), Some(&json!(12)));
        assert_eq!(fields.get("url"), Some(&json!("/products/coffee")));
        assert!(!fields.contains_key("missing"));
        assert_eq!(strategy.fields().len(), 4);
    }

    #[tokio::test]
    async fn test_qualifier_rejects_item() {
        let strategy = FieldExtractorStrategy::new("in-stock")
            .with_field(FieldExtractor::property("title"))
            .with_qualifier(|item| item.properties.get("stock") != Some(&json!(0)));

        let sold_out = coffee().with_property("stock", 0);
        let result = strategy.map_to_document(&sold_out, &index()).await.unwrap();
        assert!(result.is_none());

        let in_stock = coffee().with_property("stock", 3);
        let result = strategy.map_to_document(&in_stock, &index()).await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_default_strategy() {
        let strategy = DefaultStrategy::new();
        let fields = strategy
            .map_to_document(&coffee(), &index())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fields.get("title"), Some(&json!("Coffee")));
        assert_eq!(fields.get("item_id"), Some(&json!(42)));
        assert_eq!(fields.get("tree_path"), Some(&json!("/Products/Coffee")));
        assert_eq!(fields.get("language"), Some(&json!("en")));
    }

    #[tokio::test]
    async fn test_default_strategy_skips_unpublished() {
        let strategy = DefaultStrategy::new();
        let item = coffee().with_property("published", false);
        let result = strategy.map_to_document(&item, &index()).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_strategy_registry() {
        let registry = StrategyRegistry::with_default();
        assert!(registry.get("Default").is_ok());
        assert!(matches!(
            registry.get("custom"),
            Err(IndexingError::UnknownStrategy(_))
        ));
        assert_eq!(registry.names(), vec!["default"]);
    }
}
