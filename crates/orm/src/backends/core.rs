//! Core database abstractions
//!
//! The value, row and connection types every backend speaks. Statements are
//! always parameterized: values travel next to the SQL as `DatabaseValue`s and
//! rows come back as insertion-ordered `Row`s.

use std::fmt;
use std::ops::Index;

use serde_json::Value as JsonValue;

use crate::error::OrmResult;

/// Format used for date/time values sent to the database
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used for date values sent to the database
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Synchronous connection handle used by the query builder
///
/// Implementations execute parameterized statements only; `?` placeholders are
/// bound positionally from `params`.
pub trait DatabaseConnection {
    /// Execute a statement and return the number of affected rows
    fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64>;

    /// Fetch every row produced by a query
    fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>>;

    /// Fetch the first row produced by a query, if any
    fn fetch_optional(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>>;

    /// Row id of the most recent successful insert
    fn last_insert_id(&self) -> i64;

    /// SQL dialect spoken by this connection
    fn dialect(&self) -> SqlDialect;
}

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Name of the value's type, used in coercion errors
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Integer(_) => "integer",
            DatabaseValue::Real(_) => "real",
            DatabaseValue::Text(_) => "text",
            DatabaseValue::Blob(_) => "blob",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Integer(i) => Some(*i),
            DatabaseValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Integer(i) => JsonValue::Number(serde_json::Number::from(*i)),
            DatabaseValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::Text(s) => JsonValue::String(s.clone()),
            DatabaseValue::Blob(b) => JsonValue::Array(
                b.iter()
                    .map(|&x| JsonValue::Number(serde_json::Number::from(x)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for DatabaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseValue::Null => write!(f, "NULL"),
            DatabaseValue::Bool(b) => write!(f, "{}", b),
            DatabaseValue::Integer(i) => write!(f, "{}", i),
            DatabaseValue::Real(r) => write!(f, "{}", r),
            DatabaseValue::Text(s) => write!(f, "'{}'", s),
            DatabaseValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Integer(i64::from(value))
    }
}

impl From<u32> for DatabaseValue {
    fn from(value: u32) -> Self {
        DatabaseValue::Integer(i64::from(value))
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Integer(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Real(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::Text(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::Text(value.to_string())
    }
}

impl From<&String> for DatabaseValue {
    fn from(value: &String) -> Self {
        DatabaseValue::Text(value.clone())
    }
}

impl From<uuid::Uuid> for DatabaseValue {
    fn from(value: uuid::Uuid) -> Self {
        DatabaseValue::Text(value.hyphenated().to_string())
    }
}

impl From<chrono::NaiveDateTime> for DatabaseValue {
    fn from(value: chrono::NaiveDateTime) -> Self {
        DatabaseValue::Text(value.format(DATETIME_FORMAT).to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DatabaseValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        DatabaseValue::Text(value.format(DATETIME_FORMAT).to_string())
    }
}

impl From<chrono::NaiveDate> for DatabaseValue {
    fn from(value: chrono::NaiveDate) -> Self {
        DatabaseValue::Text(value.format(DATE_FORMAT).to_string())
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => DatabaseValue::Null,
            other => DatabaseValue::Text(other.to_string()),
        }
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// A fetched or to-be-written row: column names mapped to values, in insertion order
///
/// Inserting a column that already exists replaces its value in place, so a
/// join returning two `name` columns keeps the last one at the first position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, DatabaseValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Set a column, returning the previous value if the column existed
    pub fn insert(
        &mut self,
        column: impl Into<String>,
        value: impl Into<DatabaseValue>,
    ) -> Option<DatabaseValue> {
        let column = column.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(key, _)| *key == column) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((column, value));
                None
            }
        }
    }

    /// Builder-style `insert`
    pub fn with(mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&DatabaseValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == column)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn remove(&mut self, column: &str) -> Option<DatabaseValue> {
        let position = self.entries.iter().position(|(key, _)| key == column)?;
        Some(self.entries.remove(position).1)
    }

    /// Column names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &DatabaseValue> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` over this row: existing columns are overwritten, new ones appended
    pub fn merge(mut self, other: Row) -> Row {
        for (column, value) in other {
            self.insert(column, value);
        }
        self
    }

    /// Check that both rows carry the same set of columns, whatever their order
    pub fn same_columns(&self, other: &Row) -> bool {
        self.len() == other.len() && self.keys().all(|key| other.contains_key(key))
    }
}

impl Index<&str> for Row {
    type Output = DatabaseValue;

    fn index(&self, column: &str) -> &Self::Output {
        match self.get(column) {
            Some(value) => value,
            None => panic!("no column named '{}' in row", column),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, DatabaseValue);
    type IntoIter = std::vec::IntoIter<(String, DatabaseValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<DatabaseValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Row
where
    K: Into<String>,
    V: Into<DatabaseValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Build a [`Row`](crate::Row) from `column => value` pairs
///
/// ```
/// use lean_orm::row;
///
/// let row = row! { "name" => "Florent", "age" => 32 };
/// assert_eq!(row.keys().collect::<Vec<_>>(), vec!["name", "age"]);
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $(row.insert($column, $value);)+
        row
    }};
}

/// SQL dialect enumeration for generating database-specific SQL
///
/// Only the upsert conflict clause differs between the supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    SQLite,
    MySQL,
}

impl SqlDialect {
    /// Whether upserts use `ON CONFLICT (...) DO UPDATE` rather than `ON DUPLICATE KEY UPDATE`
    pub fn supports_on_conflict(&self) -> bool {
        matches!(self, SqlDialect::SQLite)
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::SQLite => write!(f, "sqlite"),
            SqlDialect::MySQL => write!(f, "mysql"),
        }
    }
}
