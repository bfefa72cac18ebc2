//! Model - entities stored in a table of their own
//!
//! A model is an [`Entity`] that knows its table and how to flatten itself
//! back into a row.

use std::any::type_name;

use crate::backends::{DatabaseConnection, Row};
use crate::error::ModelResult;
use crate::hydration::{Entity, EntityHydrator};
use crate::query::QueryBuilder;

/// Core trait for database models
///
/// ```
/// use lean_orm::{row, Entity, EntitySchema, Model, Row};
///
/// #[derive(Debug, Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for User {
///     fn describe(schema: &mut EntitySchema<Self>) {
///         schema
///             .field("id", |user: &mut User, value| user.id = value)
///             .field("name", |user: &mut User, value| user.name = value);
///     }
/// }
///
/// impl Model for User {
///     fn to_database_row(&self) -> Row {
///         row! { "id" => self.id, "name" => self.name.as_str() }
///     }
/// }
///
/// assert_eq!(User::table_name(), "users");
/// let user = User::from_database_row(row! { "id" => 1, "name" => "ada" }).unwrap();
/// assert_eq!(user.name, "ada");
/// ```
pub trait Model: Entity {
    /// Table name for this model, `users` for a `User` type by default
    fn table_name() -> String {
        default_table_name::<Self>()
    }

    /// Field values keyed by column, ready for `insert_single`/`update`
    fn to_database_row(&self) -> Row;

    /// Create a model instance from a database row
    fn from_database_row(row: Row) -> ModelResult<Self> {
        Ok(Self::hydrator().hydrate_one(row)?)
    }

    /// Hydrator used by `from_database_row`
    fn hydrator() -> EntityHydrator {
        EntityHydrator::new()
    }

    /// Builder already pointed at this model's table
    fn query(connection: &dyn DatabaseConnection) -> QueryBuilder<'_> {
        let mut query = QueryBuilder::new(connection);
        query.in_table(Self::table_name());
        query
    }
}

/// Lowercased last path segment of `T` followed by `s`
pub fn default_table_name<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    let base = path.rsplit("::").next().unwrap_or(path);

    format!("{}s", base.to_lowercase())
}
