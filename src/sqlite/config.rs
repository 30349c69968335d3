use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::{Connection, ConnectionSource};
use crate::error::SqlStreamsError;

use super::connection::SqliteConnection;

/// Options for opening `SQLite` connections.
///
/// Deserializable, so it can live in an application's config file:
/// ```rust
/// use sql_streams::sqlite::SqliteOptions;
///
/// let opts = SqliteOptions::from_json(r#"{ "db_path": "app.db", "wal": true }"#).unwrap();
/// assert!(opts.wal);
/// assert_eq!(opts.busy_timeout_ms, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    pub db_path: String,
    pub busy_timeout_ms: Option<u64>,
    pub wal: bool,
    pub foreign_keys: bool,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            busy_timeout_ms: None,
            wal: false,
            foreign_keys: true,
        }
    }
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    /// Parse options from JSON; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `SqlStreamsError::ConfigError` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, SqlStreamsError> {
        serde_json::from_str(json)
            .map_err(|e| SqlStreamsError::config(format!("invalid sqlite options: {e}")))
    }

    /// Open one connection with these options applied.
    ///
    /// # Errors
    /// Returns `SqlStreamsError::DriverError` if the database cannot be opened or a
    /// PRAGMA fails.
    pub fn open(&self) -> Result<SqliteConnection, SqlStreamsError> {
        let conn = rusqlite::Connection::open(&self.db_path)?;
        if let Some(ms) = self.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }
        if self.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        if self.wal {
            // journal_mode answers with the resulting mode, so it must be read back.
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(%mode, "sqlite journal mode set");
        }
        tracing::debug!(db_path = %self.db_path, wal = self.wal, "opened sqlite connection");
        Ok(SqliteConnection::new(conn))
    }

    /// A source opening a new connection per request. Each `:memory:` connection
    /// is a separate database, so in-memory use wants
    /// [`Sql::connect_single`](crate::Sql::connect_single) instead.
    #[must_use]
    pub fn source(self) -> SqliteSource {
        SqliteSource { options: self }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, on: bool) -> Self {
        self.opts.foreign_keys = on;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// # Errors
    /// As [`SqliteOptions::open`].
    pub fn open(self) -> Result<SqliteConnection, SqlStreamsError> {
        self.opts.open()
    }

    #[must_use]
    pub fn source(self) -> SqliteSource {
        self.opts.source()
    }
}

/// [`ConnectionSource`] opening a fresh `SQLite` connection per request.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    options: SqliteOptions,
}

impl SqliteSource {
    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }
}

impl ConnectionSource for SqliteSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>, SqlStreamsError> {
        Ok(Box::new(self.options.open()?))
    }
}
