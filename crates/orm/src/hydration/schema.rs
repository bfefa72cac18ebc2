//! Entity schemas
//!
//! An entity describes its fields once: name, declared type and how to assign
//! a coerced value. Schemas are built on first use and cached per type for the
//! lifetime of the process.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::coerce::{Hydrate, HydrationContext};
use crate::backends::DatabaseValue;
use crate::error::CoercionError;

/// A type rows can be hydrated into
///
/// ```
/// use lean_orm::hydration::{Entity, EntitySchema};
///
/// #[derive(Default)]
/// struct User {
///     name: String,
///     age: Option<i64>,
/// }
///
/// impl Entity for User {
///     fn describe(schema: &mut EntitySchema<Self>) {
///         schema
///             .field("name", |user: &mut User, value| user.name = value)
///             .field("age", |user: &mut User, value| user.age = value)
///             .map_data_key("user_age", "age");
///     }
/// }
/// ```
pub trait Entity: Default + 'static {
    fn describe(schema: &mut EntitySchema<Self>);
}

type Assign<E> =
    Arc<dyn Fn(&mut E, DatabaseValue, &HydrationContext<'_>) -> Result<(), CoercionError> + Send + Sync>;

fn erase<E, F>(assign: F) -> Assign<E>
where
    E: 'static,
    F: Fn(&mut E, DatabaseValue, &HydrationContext<'_>) -> Result<(), CoercionError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(assign)
}

/// One hydratable field of an entity
pub struct FieldDescriptor<E> {
    pub name: &'static str,
    pub declared_type: &'static str,
    assign: Assign<E>,
}

impl<E> FieldDescriptor<E> {
    pub(crate) fn assign(
        &self,
        entity: &mut E,
        value: DatabaseValue,
        ctx: &HydrationContext<'_>,
    ) -> Result<(), CoercionError> {
        (self.assign)(entity, value, ctx)
    }
}

impl<E> fmt::Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .finish()
    }
}

/// Fields and declarative data-key mapping of an entity type
pub struct EntitySchema<E> {
    entity: &'static str,
    fields: Vec<FieldDescriptor<E>>,
    positions: HashMap<&'static str, usize>,
    data_map: HashMap<String, String>,
}

impl<E: Entity> EntitySchema<E> {
    fn new() -> Self {
        let name = type_name::<E>();
        Self {
            entity: name.rsplit("::").next().unwrap_or(name),
            fields: Vec::new(),
            positions: HashMap::new(),
            data_map: HashMap::new(),
        }
    }

    fn build() -> Self {
        let mut schema = Self::new();
        E::describe(&mut schema);
        schema
    }

    /// Declare a field of type `T`; redeclaring a name replaces it
    pub fn field<T, F>(&mut self, name: &'static str, assign: F) -> &mut Self
    where
        T: Hydrate + 'static,
        F: Fn(&mut E, T) + Send + Sync + 'static,
    {
        let descriptor = FieldDescriptor {
            name,
            declared_type: T::declared_type(),
            assign: erase(move |entity, value, ctx| {
                assign(entity, T::hydrate(value, ctx)?);
                Ok(())
            }),
        };

        match self.positions.get(name) {
            Some(&index) => self.fields[index] = descriptor,
            None => {
                self.positions.insert(name, self.fields.len());
                self.fields.push(descriptor);
            }
        }
        self
    }

    /// Declare that the data key `key` fills the field `field`
    pub fn map_data_key(&mut self, key: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.data_map.insert(key.into(), field.into());
        self
    }

    /// Declare several data-key mappings at once
    pub fn data_map<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, field) in entries {
            self.map_data_key(key, field);
        }
        self
    }
}

impl<E> EntitySchema<E> {
    /// Short type name of the entity, used in errors
    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    pub fn fields(&self) -> &[FieldDescriptor<E>] {
        &self.fields
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    pub fn field_named(&self, field: &str) -> Option<&FieldDescriptor<E>> {
        self.position(field).map(|index| &self.fields[index])
    }

    /// Declarative data key for `key`, if any
    pub fn mapped_field(&self, key: &str) -> Option<&str> {
        self.data_map.get(key).map(String::as_str)
    }
}

impl<E> fmt::Debug for EntitySchema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("entity", &self.entity)
            .field("fields", &self.fields)
            .field("data_map", &self.data_map)
            .finish()
    }
}

static SCHEMAS: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = Lazy::new(DashMap::new);

/// Cached schema of `E`, described on first use
pub fn schema_of<E: Entity>() -> Arc<EntitySchema<E>> {
    let type_id = TypeId::of::<E>();

    let cached = SCHEMAS.get(&type_id).map(|entry| Arc::clone(entry.value()));
    if let Some(schema) = cached.and_then(|erased| erased.downcast::<EntitySchema<E>>().ok()) {
        return schema;
    }

    let schema = Arc::new(EntitySchema::<E>::build());
    tracing::debug!(
        "Cached hydration schema for {} ({} fields)",
        schema.entity_name(),
        schema.fields().len()
    );

    let erased = SCHEMAS
        .entry(type_id)
        .or_insert_with(|| Arc::clone(&schema) as Arc<dyn Any + Send + Sync>)
        .value()
        .clone();

    erased.downcast::<EntitySchema<E>>().unwrap_or(schema)
}
