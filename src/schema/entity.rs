//! Entity schema descriptions and typed property handles.

use std::any::{TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;

use crate::error::{DynamicQueryError, Result};

/// A searchable document type.
///
/// The implementation describes how the type's properties map onto the
/// indexed fields of its search index. [`EntityCache`](crate::schema::EntityCache)
/// calls [`Entity::schema`] at most once per type and keeps the result for
/// its own lifetime.
pub trait Entity: Send + Sync + 'static {
    /// Describe the index and the property to column mapping of this type.
    fn schema() -> Result<EntitySchema>;
}

/// Index name plus the ordered property to column mapping of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    index_name: String,
    columns: Vec<(String, String)>,
}

impl EntitySchema {
    /// Create a builder for the given index.
    pub fn builder<S: Into<String>>(index_name: S) -> EntitySchemaBuilder {
        EntitySchemaBuilder::new(index_name)
    }

    /// Name of the index documents of this entity live in.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Property to column pairs in declaration order.
    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    /// Look up the column a property is indexed under.
    pub fn column_of(&self, property: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, column)| column.as_str())
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

/// Builder for [`EntitySchema`].
#[derive(Debug, Clone)]
pub struct EntitySchemaBuilder {
    index_name: String,
    columns: Vec<(String, String)>,
}

impl EntitySchemaBuilder {
    /// Create a new builder for the given index.
    pub fn new<S: Into<String>>(index_name: S) -> Self {
        EntitySchemaBuilder {
            index_name: index_name.into(),
            columns: Vec::new(),
        }
    }

    /// Map a property to a column of the same name.
    pub fn field<S: Into<String>>(self, property: S) -> Self {
        let property = property.into();
        let column = property.clone();
        self.field_as(property, column)
    }

    /// Map a property to a differently named column.
    pub fn field_as<P: Into<String>, C: Into<String>>(mut self, property: P, column: C) -> Self {
        self.columns.push((property.into(), column.into()));
        self
    }

    /// Validate and build the schema.
    pub fn build(self) -> Result<EntitySchema> {
        for (index, (property, column)) in self.columns.iter().enumerate() {
            if property.is_empty() {
                return Err(DynamicQueryError::schema("Property name cannot be empty"));
            }
            if column.is_empty() {
                return Err(DynamicQueryError::schema(format!(
                    "Column name for property '{property}' cannot be empty"
                )));
            }
            if self.columns[..index].iter().any(|(name, _)| name == property) {
                return Err(DynamicQueryError::schema(format!(
                    "Property '{property}' already exists"
                )));
            }
        }

        Ok(EntitySchema {
            index_name: self.index_name,
            columns: self.columns,
        })
    }
}

/// Identity of a property: owning type plus property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyInfo {
    owner: TypeId,
    owner_name: &'static str,
    name: &'static str,
}

impl PropertyInfo {
    /// Type id of the owning entity.
    pub fn owner(&self) -> TypeId {
        self.owner
    }

    /// Type name of the owning entity.
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    /// Property name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A typed handle to a property `name` of entity `T` holding values of type `V`.
///
/// Declare these as associated constants on the entity type:
///
/// ```
/// use dynamic_query::schema::Property;
///
/// struct Product;
///
/// impl Product {
///     pub const PRICE: Property<Product, f64> = Property::new("price");
/// }
///
/// assert_eq!(Product::PRICE.name(), "price");
/// ```
pub struct Property<T, V> {
    name: &'static str,
    _marker: PhantomData<fn() -> (T, V)>,
}

impl<T, V> Property<T, V> {
    /// Create a handle for the named property.
    pub const fn new(name: &'static str) -> Self {
        Property {
            name,
            _marker: PhantomData,
        }
    }

    /// Property name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Drop the value type, keeping the owner.
    pub fn erase(self) -> PropertyRef<T> {
        PropertyRef::new(self.name)
    }
}

impl<T: 'static, V> Property<T, V> {
    /// Owner and name of this property.
    pub fn info(&self) -> PropertyInfo {
        property_info::<T>(self.name)
    }
}

impl<T, V> Clone for Property<T, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V> Copy for Property<T, V> {}

impl<T, V> fmt::Debug for Property<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("owner", &type_name::<T>())
            .field("name", &self.name)
            .finish()
    }
}

/// A property of entity `T` with its value type erased.
///
/// Used where properties of different value types are passed together.
pub struct PropertyRef<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyRef<T> {
    /// Create a handle for the named property.
    pub const fn new(name: &'static str) -> Self {
        PropertyRef {
            name,
            _marker: PhantomData,
        }
    }

    /// Property name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: 'static> PropertyRef<T> {
    /// Owner and name of this property.
    pub fn info(&self) -> PropertyInfo {
        property_info::<T>(self.name)
    }
}

impl<T, V> From<Property<T, V>> for PropertyRef<T> {
    fn from(property: Property<T, V>) -> Self {
        property.erase()
    }
}

impl<T> Clone for PropertyRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyRef<T> {}

impl<T> fmt::Debug for PropertyRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRef")
            .field("owner", &type_name::<T>())
            .field("name", &self.name)
            .finish()
    }
}

fn property_info<T: 'static>(name: &'static str) -> PropertyInfo {
    PropertyInfo {
        owner: TypeId::of::<T>(),
        owner_name: type_name::<T>(),
        name,
    }
}
