//! # lean-orm: Database Layer for lean
//!
//! Query builder over a condition tree, a pure SQL renderer, entity
//! hydration with cached per-type schemas, plus model and factory helpers.
//!
//! This crate provides the data-access core of the lean framework: a
//! `DatabaseConnection` abstraction with a SQLite backend, the fluent
//! `QueryBuilder`, and the `EntityHydrator` turning rows into typed entities.

pub mod backends;
pub mod database;
pub mod error;
pub mod factory;
pub mod hydration;
pub mod model;
pub mod query;

// Re-export core traits and types
pub use backends::{DatabaseConnection, DatabaseValue, Row, SqlDialect, SqliteConnection};
pub use database::{DatabaseConfig, DatabaseTarget};
pub use error::*;
pub use factory::ModelFactory;
pub use hydration::{Entity, EntityHydrator, EntitySchema, Hydrate, HydrationContext, Json};
pub use model::{default_table_name, Model};
pub use query::{
    ConditionBuilder, Conditional, Connector, HydratingQuery, OrderDirection, QueryBuilder,
    QueryOperator, QueryState, RenderedQuery, Statement,
};
