//! Query Builder execution of reads
//!
//! Raw reads return rows; `hydrate::<E>()` wraps the builder so the same reads
//! return entities.

use std::collections::HashMap;
use std::marker::PhantomData;

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::{DatabaseValue, Row};
use crate::error::OrmResult;
use crate::hydration::Entity;

impl<'c> QueryBuilder<'c> {
    /// Fetch the first matching row; `LIMIT 1` is rendered without touching the stored limit
    pub fn select_single(&mut self, columns: &[&str]) -> OrmResult<Option<Row>> {
        self.set_columns(columns);

        let limit = self.state.limit_count.replace(1);
        let rendered = self.prepare(&Statement::Select);
        self.state.limit_count = limit;
        let rendered = rendered?;

        self.log(&rendered);
        self.connection.fetch_optional(&rendered.sql, &rendered.bindings)
    }

    /// Fetch every matching row; no columns means `*`
    pub fn select_many(&mut self, columns: &[&str]) -> OrmResult<Vec<Row>> {
        self.set_columns(columns);

        let rendered = self.prepare(&Statement::Select)?;
        self.log(&rendered);
        self.connection.fetch_all(&rendered.sql, &rendered.bindings)
    }

    /// Count the matching rows
    pub fn count(&mut self) -> OrmResult<i64> {
        let rendered = self.prepare(&Statement::Count)?;
        self.log(&rendered);

        let row = self
            .connection
            .fetch_optional(&rendered.sql, &rendered.bindings)?;

        Ok(row
            .as_ref()
            .and_then(|row| row.get("c"))
            .and_then(DatabaseValue::as_i64)
            .unwrap_or(0))
    }

    /// Check whether at least one row matches
    pub fn exists(&mut self) -> OrmResult<bool> {
        let rendered = self.prepare(&Statement::Exists)?;
        self.log(&rendered);

        let row = self
            .connection
            .fetch_optional(&rendered.sql, &rendered.bindings)?;

        Ok(row
            .as_ref()
            .and_then(|row| row.values().next())
            .and_then(DatabaseValue::as_i64)
            == Some(1))
    }

    /// Read entities of type `E` instead of raw rows
    ///
    /// ```ignore
    /// let user: Option<User> = query
    ///     .from_table("users")
    ///     .and_where("name", "=", "Florent")?
    ///     .hydrate::<User>()
    ///     .select_single(&[])?;
    /// ```
    pub fn hydrate<E: Entity>(&mut self) -> HydratingQuery<'_, 'c, E> {
        HydratingQuery {
            builder: self,
            field_map: HashMap::new(),
            _entity: PhantomData,
        }
    }

    fn set_columns(&mut self, columns: &[&str]) {
        self.state.columns = columns.iter().map(|column| column.to_string()).collect();
    }

    fn log(&self, rendered: &RenderedQuery) {
        tracing::debug!(
            "Executing query: {} ({} bindings)",
            rendered.sql,
            rendered.bindings.len()
        );
        tracing::trace!("Bindings: {:?}", rendered.bindings);
    }
}

/// Builder view whose reads return hydrated entities
pub struct HydratingQuery<'q, 'c, E> {
    builder: &'q mut QueryBuilder<'c>,
    field_map: HashMap<String, String>,
    _entity: PhantomData<E>,
}

impl<E: Entity> HydratingQuery<'_, '_, E> {
    /// Map a data key to a field name for this read only
    pub fn map_key(mut self, key: impl Into<String>, field: impl Into<String>) -> Self {
        self.field_map.insert(key.into(), field.into());
        self
    }

    pub fn select_single(self, columns: &[&str]) -> OrmResult<Option<E>> {
        let hydrator = std::sync::Arc::clone(&self.builder.hydrator);
        match self.builder.select_single(columns)? {
            Some(row) => Ok(Some(hydrator.hydrate_one_with(row, &self.field_map)?)),
            None => Ok(None),
        }
    }

    pub fn select_many(self, columns: &[&str]) -> OrmResult<Vec<E>> {
        let hydrator = std::sync::Arc::clone(&self.builder.hydrator);
        let rows = self.builder.select_many(columns)?;
        Ok(hydrator.hydrate_many_with(rows, &self.field_map)?)
    }
}
