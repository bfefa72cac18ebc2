//! Query Builder - Core builder implementation

use std::fmt;
use std::sync::Arc;

use super::conditions::ConditionGroup;
use super::sql_generation::render;
use super::types::*;
use super::where_clause::Conditional;
use crate::backends::{DatabaseConnection, DatabaseValue};
use crate::error::OrmResult;
use crate::hydration::EntityHydrator;

/// Everything a builder accumulates between two resets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub table: String,
    pub alias: Option<String>,
    /// Selected columns, empty means `*`
    pub columns: Vec<String>,
    pub joins: Vec<JoinClause>,
    pub conditions: ConditionGroup,
    pub order_by: Vec<(String, OrderDirection)>,
    pub limit_count: Option<u64>,
    pub offset_value: Option<u64>,
}

impl QueryState {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Clear every accumulated field except the table name
    pub fn reset(&mut self) {
        self.alias = None;
        self.columns.clear();
        self.joins.clear();
        self.conditions.clear();
        self.order_by.clear();
        self.limit_count = None;
        self.offset_value = None;
    }
}

impl Conditional for QueryState {
    fn condition_group(&mut self) -> &mut ConditionGroup {
        &mut self.conditions
    }
}

/// Fluent, stateful query builder bound to a connection
///
/// Every call mutates the same builder; the accumulated state is rendered and
/// executed by the terminal methods (`insert_single`, `select_many`, ...).
pub struct QueryBuilder<'c> {
    pub(crate) connection: &'c dyn DatabaseConnection,
    pub(crate) hydrator: Arc<EntityHydrator>,
    pub(crate) state: QueryState,
    pub(crate) last: Option<RenderedQuery>,
}

impl<'c> QueryBuilder<'c> {
    /// Create a new query builder with a default hydrator
    pub fn new(connection: &'c dyn DatabaseConnection) -> Self {
        Self::with_hydrator(connection, Arc::new(EntityHydrator::new()))
    }

    pub fn with_hydrator(connection: &'c dyn DatabaseConnection, hydrator: Arc<EntityHydrator>) -> Self {
        Self {
            connection,
            hydrator,
            state: QueryState::default(),
            last: None,
        }
    }

    /// Fresh builder sharing this builder's connection and hydrator
    pub fn new_query(&self) -> QueryBuilder<'c> {
        Self::with_hydrator(self.connection, Arc::clone(&self.hydrator))
    }

    /// Set the table written to
    pub fn in_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.state.table = table.into();
        self
    }

    /// Set the table read from
    pub fn from_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.in_table(table)
    }

    /// Alias the main table in SELECT, COUNT and EXISTS queries
    pub fn alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.state.alias = Some(alias.into());
        self
    }

    /// Clear conditions, joins, columns, ordering, paging and the last rendered statement
    ///
    /// The connection, the hydrator and the table are kept.
    pub fn reset(&mut self) -> &mut Self {
        self.state.reset();
        self.last = None;
        self
    }

    /// SQL of the last rendered statement, or a SELECT preview of the current state
    pub fn to_sql(&self) -> String {
        match &self.last {
            Some(rendered) => rendered.sql.clone(),
            None => render(&self.state, &Statement::Select, self.connection.dialect())
                .map(|rendered| rendered.sql)
                .unwrap_or_default(),
        }
    }

    /// Values bound to the last rendered statement
    pub fn bindings(&self) -> &[DatabaseValue] {
        self.last
            .as_ref()
            .map(|rendered| rendered.bindings.as_slice())
            .unwrap_or_default()
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn connection(&self) -> &'c dyn DatabaseConnection {
        self.connection
    }

    pub fn hydrator(&self) -> &Arc<EntityHydrator> {
        &self.hydrator
    }

    /// Row id generated by the last insert on the connection
    pub fn last_insert_id(&self) -> i64 {
        self.connection.last_insert_id()
    }

    /// Render a statement and remember it for `to_sql()` / `bindings()`
    pub(crate) fn prepare(&mut self, statement: &Statement<'_>) -> OrmResult<RenderedQuery> {
        let rendered = render(&self.state, statement, self.connection.dialect())?;
        self.last = Some(rendered.clone());
        Ok(rendered)
    }
}

impl Conditional for QueryBuilder<'_> {
    fn condition_group(&mut self) -> &mut ConditionGroup {
        &mut self.state.conditions
    }
}

impl fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.connection.dialect())
            .field("state", &self.state)
            .field("last", &self.last)
            .finish()
    }
}
