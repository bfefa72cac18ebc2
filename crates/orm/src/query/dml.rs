//! Query Builder DML operations (INSERT, UPDATE, UPSERT, DELETE)

use super::builder::QueryBuilder;
use super::types::*;
use crate::backends::Row;
use crate::error::OrmResult;

impl QueryBuilder<'_> {
    /// Insert one row into the current table, returns whether a row was written
    ///
    /// Columns are taken from the row in insertion order.
    pub fn insert_single(&mut self, row: Row) -> OrmResult<bool> {
        let rows = [row];
        let affected = self.execute_statement(&Statement::Insert(&rows))?;
        Ok(affected > 0)
    }

    /// Insert several rows in one statement
    ///
    /// Every row must have the first row's columns; values are bound in the
    /// first row's column order.
    pub fn insert_many(&mut self, rows: Vec<Row>) -> OrmResult<bool> {
        let affected = self.execute_statement(&Statement::Insert(&rows))?;
        Ok(affected > 0)
    }

    /// Update the rows matching the current conditions
    pub fn update(&mut self, row: Row) -> OrmResult<bool> {
        let affected = self.execute_statement(&Statement::Update(&row))?;
        Ok(affected > 0)
    }

    /// Insert a row, or update its non-key columns when `conflict_keys` already exist
    pub fn upsert_single(&mut self, row: Row, conflict_keys: &[&str]) -> OrmResult<bool> {
        let affected = self.execute_statement(&Statement::Upsert {
            row: &row,
            conflict_keys,
        })?;
        Ok(affected > 0)
    }

    /// Delete the rows matching the current conditions, returns how many were removed
    pub fn delete(&mut self) -> OrmResult<u64> {
        self.execute_statement(&Statement::Delete)
    }

    fn execute_statement(&mut self, statement: &Statement<'_>) -> OrmResult<u64> {
        let rendered = self.prepare(statement)?;

        tracing::debug!(
            "Executing statement: {} ({} bindings)",
            rendered.sql,
            rendered.bindings.len()
        );
        tracing::trace!("Bindings: {:?}", rendered.bindings);

        self.connection.execute(&rendered.sql, &rendered.bindings)
    }
}
