//! Resolution of typed properties to indexed column names.
//!
//! [`EntityCache`] loads each entity's schema lazily, once per type, and keeps
//! it for its own lifetime. Schemas are immutable descriptions, so entries are
//! never invalidated. Create one cache at the application's composition root
//! and share it through an `Arc` with every query that needs it.

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;
use parking_lot::RwLock;

use crate::error::{DynamicQueryError, Result};
use crate::schema::entity::{Entity, Property, PropertyInfo, PropertyRef};

/// Resolved metadata of one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    column_name: String,
    property_name: String,
    owner: TypeId,
    owner_name: &'static str,
}

impl ColumnInfo {
    /// Name of the indexed field.
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// Name of the property on the entity type.
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// Type id of the owning entity.
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Type name of the owning entity.
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }
}

/// Resolved metadata of one entity type.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    owner: TypeId,
    owner_name: &'static str,
    index_name: String,
    columns: AHashMap<String, ColumnInfo>,
}

impl EntityInfo {
    fn load<T: Entity>() -> Result<Self> {
        let owner = TypeId::of::<T>();
        let owner_name = type_name::<T>();
        let schema = T::schema()?;

        let columns = schema
            .columns()
            .iter()
            .map(|(property, column)| {
                let info = ColumnInfo {
                    column_name: column.clone(),
                    property_name: property.clone(),
                    owner,
                    owner_name,
                };
                (property.clone(), info)
            })
            .collect();

        Ok(EntityInfo {
            owner,
            owner_name,
            index_name: schema.index_name().to_string(),
            columns,
        })
    }

    /// Type id of the entity.
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Type name of the entity.
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    /// Index the entity is stored in.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Look up a property's column metadata.
    pub fn column(&self, property: &str) -> Option<&ColumnInfo> {
        self.columns.get(property)
    }

    /// Number of mapped properties.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check whether no property is mapped.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Thread-safe, lazily populated cache of entity metadata.
#[derive(Debug, Default)]
pub struct EntityCache {
    entities: RwLock<AHashMap<TypeId, Arc<EntityInfo>>>,
}

impl EntityCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the metadata of `T`, loading its schema on first use.
    ///
    /// Concurrent first calls may each load the schema; only the first value
    /// published is kept and returned to all callers.
    pub fn entity_info<T: Entity>(&self) -> Result<Arc<EntityInfo>> {
        let owner = TypeId::of::<T>();
        if let Some(info) = self.entities.read().get(&owner) {
            return Ok(Arc::clone(info));
        }

        let loaded = Arc::new(EntityInfo::load::<T>()?);
        let mut guard = self.entities.write();
        let info = guard.entry(owner).or_insert_with(|| {
            debug!(
                "loaded schema of {} ({} properties, index '{}')",
                loaded.owner_name(),
                loaded.len(),
                loaded.index_name()
            );
            Arc::clone(&loaded)
        });
        Ok(Arc::clone(info))
    }

    /// Resolve a property identity against the metadata of `T`.
    pub fn column_info<T: Entity>(&self, property: &PropertyInfo) -> Result<ColumnInfo> {
        if property.owner() != TypeId::of::<T>() {
            return Err(DynamicQueryError::unresolved_property(
                property.owner_name(),
                property.name(),
            ));
        }

        let info = self.entity_info::<T>()?;
        info.column(property.name())
            .filter(|column| column.owner() == property.owner())
            .cloned()
            .ok_or_else(|| {
                DynamicQueryError::unresolved_property(property.owner_name(), property.name())
            })
    }

    /// Resolve a typed property to its column metadata.
    pub fn resolve<T: Entity, V>(&self, property: Property<T, V>) -> Result<ColumnInfo> {
        self.column_info::<T>(&property.info())
    }

    /// Resolve a typed property to its indexed field name.
    pub fn column_name<T: Entity, V>(&self, property: Property<T, V>) -> Result<String> {
        self.resolve(property)
            .map(|column| column.column_name().to_string())
    }

    /// Resolve an erased property to its indexed field name.
    pub fn column_name_of<T: Entity>(&self, property: PropertyRef<T>) -> Result<String> {
        self.column_info::<T>(&property.info())
            .map(|column| column.column_name().to_string())
    }

    /// Check whether the metadata of `T` has been loaded.
    pub fn contains<T: Any>(&self) -> bool {
        self.entities.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of loaded entity types.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Check whether no entity has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::entity::EntitySchema;

    struct Article;

    impl Article {
        const TITLE: Property<Article, String> = Property::new("title");
        const VIEWS: Property<Article, u64> = Property::new("views");
        const MISSING: Property<Article, String> = Property::new("missing");
    }

    impl Entity for Article {
        fn schema() -> Result<EntitySchema> {
            EntitySchema::builder("articles")
                .field("title")
                .field_as("views", "view_count")
                .build()
        }
    }

    struct Broken;

    impl Entity for Broken {
        fn schema() -> Result<EntitySchema> {
            EntitySchema::builder("broken").field("a").field("a").build()
        }
    }

    #[test]
    fn test_resolve_column_names() {
        let cache = EntityCache::new();

        assert_eq!(cache.column_name(Article::TITLE).unwrap(), "title");
        assert_eq!(cache.column_name(Article::VIEWS).unwrap(), "view_count");
        assert_eq!(
            cache.column_name_of(Article::VIEWS.erase()).unwrap(),
            "view_count"
        );
    }

    #[test]
    fn test_resolution_is_idempotent_and_cached() {
        let cache = EntityCache::new();
        assert!(cache.is_empty());

        let first = cache.resolve(Article::VIEWS).unwrap();
        let loaded = cache.entity_info::<Article>().unwrap();
        let second = cache.resolve(Article::VIEWS).unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(
            &loaded,
            &cache.entity_info::<Article>().unwrap()
        ));
        assert!(cache.contains::<Article>());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_property_is_unresolved() {
        let cache = EntityCache::new();

        match cache.resolve(Article::MISSING) {
            Err(DynamicQueryError::UnresolvedProperty { property, .. }) => {
                assert_eq!(property, "missing");
            }
            other => panic!("Expected unresolved property, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_owner_is_unresolved() {
        let cache = EntityCache::new();
        let foreign = Property::<Broken, String>::new("title").info();

        assert!(matches!(
            cache.column_info::<Article>(&foreign),
            Err(DynamicQueryError::UnresolvedProperty { .. })
        ));
    }

    #[test]
    fn test_schema_error_is_not_cached() {
        let cache = EntityCache::new();

        assert!(matches!(
            cache.entity_info::<Broken>(),
            Err(DynamicQueryError::Schema(_))
        ));
        assert!(!cache.contains::<Broken>());
    }

    mod other {
        use super::*;

        pub struct Article;

        impl Article {
            pub const TITLE: Property<Article, String> = Property::new("title");
        }

        impl Entity for Article {
            fn schema() -> Result<EntitySchema> {
                EntitySchema::builder("archived_articles")
                    .field_as("title", "headline")
                    .build()
            }
        }
    }

    #[test]
    fn test_column_info_carries_owner_type() {
        let cache = EntityCache::new();

        let current = cache.resolve(Article::TITLE).unwrap();
        let archived = cache.resolve(other::Article::TITLE).unwrap();

        assert_eq!(current.owner(), TypeId::of::<Article>());
        assert_eq!(archived.owner(), TypeId::of::<other::Article>());
        assert_ne!(current.owner(), archived.owner());
        assert_ne!(current, archived);
        assert_eq!(archived.column_name(), "headline");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_entity_info() {
        let cache = EntityCache::new();
        let info = cache.entity_info::<Article>().unwrap();

        assert_eq!(info.index_name(), "articles");
        assert_eq!(info.len(), 2);
        assert_eq!(info.owner(), TypeId::of::<Article>());
        assert_eq!(
            info.column("views").map(|c| c.column_name()),
            Some("view_count")
        );
    }
}
