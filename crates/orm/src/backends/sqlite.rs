//! SQLite backend built on rusqlite

use std::path::Path;

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql};

use super::core::{DatabaseConnection, DatabaseValue, Row, SqlDialect};
use crate::database::{DatabaseConfig, DatabaseTarget};
use crate::error::{ModelError, OrmResult};

/// Connection handle over a single rusqlite connection
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Open a private in-memory database
    pub fn open_in_memory() -> OrmResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> OrmResult<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Open the database described by a validated configuration
    pub fn connect(config: &DatabaseConfig) -> OrmResult<Self> {
        let conn = match config.target()? {
            DatabaseTarget::Memory => Connection::open_in_memory()?,
            DatabaseTarget::File(path) => {
                let mut flags = OpenFlags::default();
                if !config.create_if_missing {
                    flags = flags.difference(OpenFlags::SQLITE_OPEN_CREATE);
                }
                Connection::open_with_flags(&path, flags).map_err(|err| {
                    ModelError::Connection(format!("cannot open {}: {}", path.display(), err))
                })?
            }
        };

        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        tracing::debug!(
            "Opened sqlite database {} (foreign_keys={})",
            config.url,
            config.foreign_keys
        );

        Ok(Self { conn })
    }

    /// Wrap an already opened connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Run a batch of `;`-separated statements without parameters, e.g. schema setup
    pub fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        tracing::debug!("Executing batch: {}", sql);
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Access the underlying rusqlite connection
    pub fn inner(&self) -> &Connection {
        &self.conn
    }

    fn query_rows(
        &self,
        sql: &str,
        params: &[DatabaseValue],
        limit: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let mut record = Row::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                record.insert(column.as_str(), DatabaseValue::from(row.get_ref(index)?));
            }
            records.push(record);

            if limit.is_some_and(|limit| records.len() >= limit) {
                break;
            }
        }

        Ok(records)
    }
}

impl DatabaseConnection for SqliteConnection {
    fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        let affected = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>> {
        self.query_rows(sql, params, None)
    }

    fn fetch_optional(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>> {
        Ok(self.query_rows(sql, params, Some(1))?.pop())
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::SQLite
    }
}

impl ToSql for DatabaseValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            DatabaseValue::Null => ToSqlOutput::Owned(Value::Null),
            DatabaseValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            DatabaseValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            DatabaseValue::Real(r) => ToSqlOutput::Owned(Value::Real(*r)),
            DatabaseValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            DatabaseValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<ValueRef<'_>> for DatabaseValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => DatabaseValue::Null,
            ValueRef::Integer(i) => DatabaseValue::Integer(i),
            ValueRef::Real(r) => DatabaseValue::Real(r),
            ValueRef::Text(t) => DatabaseValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => DatabaseValue::Blob(b.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn connection() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT, price REAL, data BLOB);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_execute_and_fetch_map_storage_classes() {
        let conn = connection();
        let affected = conn
            .execute(
                "INSERT INTO items (label, price, data) VALUES (?, ?, ?)",
                &["pen".into(), 1.5.into(), DatabaseValue::Blob(vec![1, 2])],
            )
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(conn.last_insert_id(), 1);

        let row = conn
            .fetch_optional("SELECT * FROM items WHERE label = ?", &["pen".into()])
            .unwrap()
            .unwrap();

        assert_eq!(
            row,
            row! {
                "id" => 1,
                "label" => "pen",
                "price" => 1.5,
                "data" => DatabaseValue::Blob(vec![1, 2]),
            }
        );
    }

    #[test]
    fn test_bool_and_null_parameters() {
        let conn = connection();
        conn.execute(
            "INSERT INTO items (label, price) VALUES (?, ?)",
            &[DatabaseValue::Bool(true), DatabaseValue::Null],
        )
        .unwrap();

        let rows = conn.fetch_all("SELECT label, price FROM items", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["label"], DatabaseValue::Integer(1));
        assert!(rows[0]["price"].is_null());
    }

    #[test]
    fn test_fetch_optional_on_empty_result() {
        let conn = connection();
        assert!(conn
            .fetch_optional("SELECT * FROM items", &[])
            .unwrap()
            .is_none());
        assert_eq!(conn.dialect(), SqlDialect::SQLite);
    }

    #[test]
    fn test_driver_errors_propagate() {
        let conn = connection();
        let err = conn.fetch_all("SELECT * FROM missing", &[]).unwrap_err();
        assert!(matches!(err, crate::error::ModelError::Database(_)));
    }

    #[test]
    fn test_connect_reports_unopenable_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(format!("sqlite://{}", dir.path().join("absent.db").display()))
            .with_create_if_missing(false);

        match SqliteConnection::connect(&config) {
            Err(ModelError::Connection(message)) => assert!(message.contains("absent.db")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert!(!dir.path().join("absent.db").exists());
    }
}
