//! Error types for the ORM system
//!
//! Database failures are carried unchanged; query-building, hydration and
//! configuration failures each get their own type.

use std::fmt;

use lean_core::{ConfigError, CoreError};
use thiserror::Error;

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// ORM error type alias
pub type OrmError = ModelError;

/// ORM result type alias
pub type OrmResult<T> = ModelResult<T>;

/// Result type alias for query building
pub type QueryResult<T> = Result<T, QueryError>;

/// Error types for ORM operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// Error reported by the database driver
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Query building error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),
    /// Row could not be turned into an entity
    #[error("Hydration error: {0}")]
    Hydration(#[from] HydrationError),
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// Connection could not be established or used
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Error types for query builder operations
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Operator outside the supported set
    InvalidOperator(String),
    /// Invalid parameter binding
    InvalidParameter(String),
    /// `IN`/`NOT IN` with no values
    EmptyValueList(String),
    /// Missing required fields
    MissingFields(String),
    /// A multi-row insert whose rows do not share the first row's columns
    InconsistentRows(usize),
    /// Unsupported operation
    UnsupportedOperation(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidOperator(op) => write!(f, "Invalid operator: {}", op),
            QueryError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            QueryError::EmptyValueList(column) => {
                write!(f, "Empty value list for column '{}'", column)
            }
            QueryError::MissingFields(msg) => write!(f, "Missing fields: {}", msg),
            QueryError::InconsistentRows(index) => write!(
                f,
                "Row {} does not have the same columns as the first row",
                index
            ),
            QueryError::UnsupportedOperation(msg) => write!(f, "Unsupported operation: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}

/// Failure while hydrating an entity from a row
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("cannot hydrate field '{field}' of {entity} from key '{key}': {source}")]
    Field {
        entity: &'static str,
        field: &'static str,
        key: String,
        source: CoercionError,
    },

    #[error("key '{key}' is mapped to unknown field '{field}' of {entity}")]
    UnknownField {
        entity: &'static str,
        key: String,
        field: String,
    },
}

/// Failure while converting a single database value into a field type
#[derive(Debug, Error)]
pub enum CoercionError {
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("cannot convert {value} into {expected}")]
    InvalidValue {
        expected: &'static str,
        value: String,
    },

    #[error("invalid JSON {raw:?}: {reason}")]
    JsonDecode { raw: String, reason: String },

    #[error("{value} is not a valid backing value of {enum_name}")]
    UnknownBacking {
        enum_name: &'static str,
        value: String,
    },

    #[error("no binding registered for {interface}")]
    Unresolvable { interface: &'static str },

    #[error("failed to construct {interface}: {source}")]
    Construction {
        interface: &'static str,
        source: CoreError,
    },
}

impl CoercionError {
    pub(crate) fn mismatch(expected: &'static str, actual: &crate::DatabaseValue) -> Self {
        CoercionError::TypeMismatch {
            expected,
            actual: actual.kind(),
        }
    }

    pub(crate) fn invalid(expected: &'static str, value: impl fmt::Display) -> Self {
        CoercionError::InvalidValue {
            expected,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_messages() {
        assert_eq!(
            QueryError::InvalidOperator("<>".into()).to_string(),
            "Invalid operator: <>"
        );
        assert_eq!(
            QueryError::InconsistentRows(2).to_string(),
            "Row 2 does not have the same columns as the first row"
        );

        let err: ModelError = QueryError::EmptyValueList("stuff".into()).into();
        assert_eq!(
            err.to_string(),
            "Query error: Empty value list for column 'stuff'"
        );
    }

    #[test]
    fn test_hydration_error_names_field_and_types() {
        let err = HydrationError::Field {
            entity: "User",
            field: "age",
            key: "age".into(),
            source: CoercionError::TypeMismatch {
                expected: "i64",
                actual: "blob",
            },
        };

        assert_eq!(
            err.to_string(),
            "cannot hydrate field 'age' of User from key 'age': expected i64, got blob"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
