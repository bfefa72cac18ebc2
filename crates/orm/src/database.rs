//! Database configuration
//!
//! Describes which SQLite database to open and how, loaded from the
//! environment like every other application config.

use std::collections::HashMap;
use std::path::PathBuf;

use lean_core::config::{env_flag, env_or_default};
use lean_core::{AppConfigTrait, ConfigError, ConfigSource};

use crate::backends::SqliteConnection;
use crate::error::OrmResult;

/// URL opening a private in-memory database
pub const MEMORY_URL: &str = "sqlite::memory:";

/// Where a configured database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Memory,
    File(PathBuf),
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare file path
    pub url: String,
    /// Enforce foreign key constraints on the connection
    pub foreign_keys: bool,
    /// Create the database file when it does not exist yet
    pub create_if_missing: bool,
    sources: HashMap<String, ConfigSource>,
}

impl DatabaseConfig {
    /// Configuration for the given URL with default flags
    pub fn new(url: impl Into<String>) -> Self {
        let sources = ["url", "foreign_keys", "create_if_missing"]
            .into_iter()
            .map(|field| (field.to_string(), ConfigSource::Programmatic))
            .collect();

        Self {
            url: url.into(),
            foreign_keys: true,
            create_if_missing: true,
            sources,
        }
    }

    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(MEMORY_URL)
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self.sources
            .insert("foreign_keys".to_string(), ConfigSource::Programmatic);
        self
    }

    pub fn with_create_if_missing(mut self, enabled: bool) -> Self {
        self.create_if_missing = enabled;
        self.sources
            .insert("create_if_missing".to_string(), ConfigSource::Programmatic);
        self
    }

    /// Resolve the URL into a database target
    pub fn target(&self) -> Result<DatabaseTarget, ConfigError> {
        let url = self.url.trim();

        if url.is_empty() {
            return Err(ConfigError::missing_required(
                "url",
                "Set DATABASE_URL to sqlite::memory: or a database file path",
            ));
        }

        if url == MEMORY_URL || url == ":memory:" {
            return Ok(DatabaseTarget::Memory);
        }

        let path = if let Some(path) = url.strip_prefix("sqlite://") {
            path
        } else if let Some(path) = url.strip_prefix("sqlite:") {
            path
        } else if url.contains("://") {
            return Err(ConfigError::invalid_value(
                "url",
                url,
                "a sqlite URL (sqlite::memory:, sqlite://<path>) or a file path",
            ));
        } else {
            url
        };

        if path.is_empty() {
            return Err(ConfigError::invalid_value("url", url, "a database file path"));
        }

        Ok(DatabaseTarget::File(PathBuf::from(path)))
    }

    /// Open a connection for this configuration
    pub fn connect(&self) -> OrmResult<SqliteConnection> {
        SqliteConnection::connect(self)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl AppConfigTrait for DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let (url, url_source) =
            env_or_default("DATABASE_URL", "url", MEMORY_URL.to_string(), "a database URL")?;
        let (foreign_keys, foreign_keys_source) =
            env_flag("DATABASE_FOREIGN_KEYS", "foreign_keys", true)?;
        let (create_if_missing, create_source) =
            env_flag("DATABASE_CREATE", "create_if_missing", true)?;

        let mut sources = HashMap::new();
        sources.insert("url".to_string(), url_source);
        sources.insert("foreign_keys".to_string(), foreign_keys_source);
        sources.insert("create_if_missing".to_string(), create_source);

        let config = Self {
            url,
            foreign_keys,
            create_if_missing,
            sources,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.target().map(|_| ())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        self.sources.clone()
    }
}
