//! Query Builder JOIN operations

use super::builder::QueryBuilder;
use super::types::*;
use crate::error::{QueryError, QueryResult};

impl QueryBuilder<'_> {
    /// Add an INNER JOIN, conditions are attached with `on()`
    pub fn join(&mut self, table: impl Into<String>, alias: Option<&str>) -> &mut Self {
        self.state.joins.push(JoinClause {
            table: table.into(),
            alias: alias.map(str::to_string),
            on_conditions: Vec::new(),
        });
        self
    }

    /// Add `left op right` to the most recent join; both sides are columns
    pub fn on(&mut self, left: &str, operator: &str, right: &str) -> QueryResult<&mut Self> {
        let operator: QueryOperator = operator.parse()?;
        if !operator.is_scalar() {
            return Err(QueryError::UnsupportedOperation(format!(
                "{} cannot compare two columns in a join",
                operator
            )));
        }

        let join = self.state.joins.last_mut().ok_or_else(|| {
            QueryError::UnsupportedOperation("on() called before join()".to_string())
        })?;

        join.on_conditions.push(JoinCondition {
            left: left.to_string(),
            operator,
            right: right.to_string(),
        });

        Ok(self)
    }
}
