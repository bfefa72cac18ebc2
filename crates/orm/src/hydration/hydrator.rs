//! Entity hydrator
//!
//! Maps flat rows onto entities. For each data key the target field is, in
//! order: the field with the same name, the call-level map, the hydrator's
//! map for that entity type, then the entity's declarative map. Keys that
//! match nothing are dropped.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use lean_core::ServiceRegistry;

use super::coerce::HydrationContext;
use super::schema::{schema_of, Entity, EntitySchema};
use crate::backends::Row;
use crate::error::HydrationError;

/// Hydrates rows into entities described by [`Entity`]
#[derive(Debug, Default, Clone)]
pub struct EntityHydrator {
    resolver: Option<Arc<ServiceRegistry>>,
    data_maps: HashMap<TypeId, HashMap<String, String>>,
}

impl EntityHydrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve interface-typed fields (`Box<dyn Trait>`) through `registry`
    pub fn with_resolver(mut self, registry: Arc<ServiceRegistry>) -> Self {
        self.resolver = Some(registry);
        self
    }

    /// Data-key to field mapping applied whenever this hydrator builds an `E`
    pub fn with_data_map<E, K, V>(mut self, map: impl IntoIterator<Item = (K, V)>) -> Self
    where
        E: Entity,
        K: Into<String>,
        V: Into<String>,
    {
        self.data_maps
            .entry(TypeId::of::<E>())
            .or_default()
            .extend(map.into_iter().map(|(key, field)| (key.into(), field.into())));
        self
    }

    pub fn resolver(&self) -> Option<&Arc<ServiceRegistry>> {
        self.resolver.as_ref()
    }

    pub fn hydrate_one<E: Entity>(&self, row: Row) -> Result<E, HydrationError> {
        self.hydrate_one_with(row, &HashMap::new())
    }

    pub fn hydrate_one_with<E: Entity>(
        &self,
        row: Row,
        field_map: &HashMap<String, String>,
    ) -> Result<E, HydrationError> {
        let schema = schema_of::<E>();
        let plan = self.plan(&schema, &row, field_map)?;
        self.hydrate_row(&schema, &plan, row)
    }

    pub fn hydrate_many<E: Entity>(&self, rows: Vec<Row>) -> Result<Vec<E>, HydrationError> {
        self.hydrate_many_with(rows, &HashMap::new())
    }

    /// Hydrate every row with the key plan computed from the first one
    pub fn hydrate_many_with<E: Entity>(
        &self,
        rows: Vec<Row>,
        field_map: &HashMap<String, String>,
    ) -> Result<Vec<E>, HydrationError> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };

        let schema = schema_of::<E>();
        let plan = self.plan(&schema, first, field_map)?;

        rows.into_iter()
            .map(|row| self.hydrate_row(&schema, &plan, row))
            .collect()
    }

    /// Field position for every key of `row` that targets a field
    fn plan<E: Entity>(
        &self,
        schema: &EntitySchema<E>,
        row: &Row,
        field_map: &HashMap<String, String>,
    ) -> Result<HashMap<String, usize>, HydrationError> {
        let type_map = self.data_maps.get(&TypeId::of::<E>());
        let mut plan = HashMap::with_capacity(row.len());

        for key in row.keys() {
            let target = if schema.position(key).is_some() {
                Some(key)
            } else {
                field_map
                    .get(key)
                    .or_else(|| type_map.and_then(|map| map.get(key)))
                    .map(String::as_str)
                    .or_else(|| schema.mapped_field(key))
            };

            let Some(field) = target else {
                tracing::trace!("Dropping key '{}' unknown to {}", key, schema.entity_name());
                continue;
            };

            let position = schema
                .position(field)
                .ok_or_else(|| HydrationError::UnknownField {
                    entity: schema.entity_name(),
                    key: key.to_string(),
                    field: field.to_string(),
                })?;

            plan.insert(key.to_string(), position);
        }

        Ok(plan)
    }

    fn hydrate_row<E: Entity>(
        &self,
        schema: &EntitySchema<E>,
        plan: &HashMap<String, usize>,
        row: Row,
    ) -> Result<E, HydrationError> {
        let ctx = HydrationContext::new(self.resolver.as_deref());
        let mut entity = E::default();

        for (key, value) in row {
            let Some(&position) = plan.get(&key) else {
                continue;
            };

            let field = &schema.fields()[position];
            field
                .assign(&mut entity, value, &ctx)
                .map_err(|source| HydrationError::Field {
                    entity: schema.entity_name(),
                    field: field.name,
                    key,
                    source,
                })?;
        }

        Ok(entity)
    }
}
