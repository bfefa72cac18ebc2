//! Query Builder Types - Core types and enums for query building

use std::fmt;
use std::str::FromStr;

use crate::backends::{DatabaseValue, Row};
use crate::error::QueryError;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
}

impl QueryOperator {
    /// `IN` and `NOT IN`, which take a list of values
    pub fn is_list(&self) -> bool {
        matches!(self, QueryOperator::In | QueryOperator::NotIn)
    }

    pub fn is_range(&self) -> bool {
        matches!(self, QueryOperator::Between)
    }

    /// Operators comparing against exactly one value
    pub fn is_scalar(&self) -> bool {
        !self.is_list() && !self.is_range()
    }
}

impl FromStr for QueryOperator {
    type Err = QueryError;

    /// Case-insensitive, runs of whitespace count as one space (`not   like`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        match normalized.as_str() {
            "=" => Ok(QueryOperator::Equal),
            "!=" => Ok(QueryOperator::NotEqual),
            "<" => Ok(QueryOperator::LessThan),
            "<=" => Ok(QueryOperator::LessThanOrEqual),
            ">" => Ok(QueryOperator::GreaterThan),
            ">=" => Ok(QueryOperator::GreaterThanOrEqual),
            "LIKE" => Ok(QueryOperator::Like),
            "NOT LIKE" => Ok(QueryOperator::NotLike),
            "IN" => Ok(QueryOperator::In),
            "NOT IN" => Ok(QueryOperator::NotIn),
            "BETWEEN" => Ok(QueryOperator::Between),
            _ => Err(QueryError::InvalidOperator(s.to_string())),
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::Between => write!(f, "BETWEEN"),
        }
    }
}

/// Boolean connector joining a condition to its previous sibling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

/// `left op right` inside a join's ON clause, both sides being column references
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub left: String,
    pub operator: QueryOperator,
    pub right: String,
}

/// Inner join clause
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub alias: Option<String>,
    pub on_conditions: Vec<JoinCondition>,
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Statement kinds the renderer produces from the builder state
#[derive(Debug, Clone, Copy)]
pub enum Statement<'a> {
    Select,
    Count,
    Exists,
    Delete,
    Insert(&'a [Row]),
    Update(&'a Row),
    Upsert {
        row: &'a Row,
        conflict_keys: &'a [&'a str],
    },
}

/// Rendered SQL together with its bound values in placeholder order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub bindings: Vec<DatabaseValue>,
}

impl RenderedQuery {
    /// Number of `?` placeholders in the SQL
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

impl fmt::Display for RenderedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing_is_case_and_whitespace_insensitive() {
        assert_eq!("=".parse::<QueryOperator>().unwrap(), QueryOperator::Equal);
        assert_eq!("not like".parse::<QueryOperator>().unwrap(), QueryOperator::NotLike);
        assert_eq!(" NOT \t IN ".parse::<QueryOperator>().unwrap(), QueryOperator::NotIn);
        assert_eq!("between".parse::<QueryOperator>().unwrap(), QueryOperator::Between);
    }

    #[test]
    fn test_operator_allow_list() {
        for op in ["<>", "IS NULL", "==", "NOTLIKE", ""] {
            assert_eq!(
                op.parse::<QueryOperator>(),
                Err(QueryError::InvalidOperator(op.to_string()))
            );
        }
    }

    #[test]
    fn test_operator_arity_classes() {
        assert!(QueryOperator::In.is_list());
        assert!(QueryOperator::Between.is_range());
        assert!(QueryOperator::Like.is_scalar());
        assert!(!QueryOperator::NotIn.is_scalar());
    }
}
