//! Result Hydration
//!
//! Builds typed entities from flat database rows.

pub mod coerce;
pub mod hydrator;
pub mod schema;

pub use coerce::{decode_json, hydrate_backed, BackedEnum, Hydrate, HydrationContext, Json};
pub use hydrator::EntityHydrator;
pub use schema::{schema_of, Entity, EntitySchema, FieldDescriptor};
