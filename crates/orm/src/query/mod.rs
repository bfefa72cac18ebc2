//! Query Builder Module - fluent, stateful query builder over a condition tree
//!
//! The builder accumulates a `QueryState`; `sql_generation::render` turns that
//! state into parameterized SQL and the terminal methods execute it on the
//! bound connection.

pub mod builder;
pub mod conditions;
pub mod dml;
pub mod execution;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::{QueryBuilder, QueryState};
pub use conditions::{Condition, ConditionClause, ConditionGroup};
pub use execution::HydratingQuery;
pub use sql_generation::{quote_identifier, render};
pub use types::{
    Connector, JoinClause, JoinCondition, OrderDirection, QueryOperator, RenderedQuery, Statement,
};
pub use where_clause::{ConditionBuilder, Conditional};
