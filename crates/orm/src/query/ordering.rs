//! Query Builder ORDER BY operations

use super::builder::QueryBuilder;
use super::types::*;

impl QueryBuilder<'_> {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.state.order_by.push((column.into(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(&mut self, column: impl Into<String>) -> &mut Self {
        self.state.order_by.push((column.into(), OrderDirection::Desc));
        self
    }
}
