use std::sync::{Arc, Mutex, MutexGuard};

use crate::driver::{Connection, IsolationLevel, Statement};
use crate::error::{BoxError, SqlStreamsError};

use super::query::SqliteStatement;

/// A rusqlite connection shared with the statements prepared on it. `None` once closed.
pub(crate) type SharedConnection = Arc<Mutex<Option<rusqlite::Connection>>>;

fn lock(shared: &SharedConnection) -> MutexGuard<'_, Option<rusqlite::Connection>> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Run `func` against the live connection.
pub(crate) fn with_sqlite<F, R>(shared: &SharedConnection, func: F) -> Result<R, BoxError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error>,
{
    let mut guard = lock(shared);
    let conn = guard
        .as_mut()
        .ok_or_else(|| -> BoxError { "sqlite connection is closed".into() })?;
    Ok(func(conn)?)
}

/// [`Connection`] over a single rusqlite connection.
///
/// `SQLite` has no session-level auto-commit switch, so turning auto-commit off
/// opens an explicit transaction with `BEGIN`, and `commit`/`rollback` end it and
/// immediately open the next one.
pub struct SqliteConnection {
    shared: SharedConnection,
    auto_commit: bool,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("auto_commit", &self.auto_commit)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SqliteConnection {
    #[must_use]
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Some(conn))),
            auto_commit: true,
        }
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns `SqlStreamsError::DriverError` if `SQLite` cannot open it.
    pub fn open_in_memory() -> Result<Self, SqlStreamsError> {
        Ok(Self::new(rusqlite::Connection::open_in_memory()?))
    }

    /// Run a semicolon-separated script, e.g. schema setup.
    ///
    /// # Errors
    /// Returns `SqlStreamsError::DriverError` if any statement fails.
    pub fn execute_script(&self, sql: &str) -> Result<(), SqlStreamsError> {
        Ok(with_sqlite(&self.shared, |c| c.execute_batch(sql))?)
    }

    fn end_transaction(&mut self, verb: &'static str) -> Result<(), BoxError> {
        if self.auto_commit {
            return Err(format!("cannot {verb} in auto-commit mode").into());
        }
        with_sqlite(&self.shared, |c| {
            if !c.is_autocommit() {
                c.execute_batch(verb)?;
            }
            c.execute_batch("BEGIN")
        })
    }
}

impl Connection for SqliteConnection {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>, BoxError> {
        // Compile once up front so syntax errors surface here, not at execution.
        with_sqlite(&self.shared, |c| c.prepare_cached(sql).map(drop))?;
        Ok(Box::new(SqliteStatement::new(Arc::clone(&self.shared), sql)))
    }

    fn auto_commit(&self) -> Result<bool, BoxError> {
        Ok(self.auto_commit)
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), BoxError> {
        if auto_commit == self.auto_commit {
            return Ok(());
        }
        if auto_commit {
            with_sqlite(&self.shared, |c| {
                if c.is_autocommit() {
                    Ok(())
                } else {
                    c.execute_batch("COMMIT")
                }
            })?;
        } else {
            with_sqlite(&self.shared, |c| c.execute_batch("BEGIN"))?;
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), BoxError> {
        let pragma = match level {
            IsolationLevel::ReadUncommitted => "PRAGMA read_uncommitted = 1;",
            IsolationLevel::ReadCommitted
            | IsolationLevel::RepeatableRead
            | IsolationLevel::Serializable => "PRAGMA read_uncommitted = 0;",
        };
        with_sqlite(&self.shared, |c| c.execute_batch(pragma))
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        self.end_transaction("ROLLBACK")
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let taken = lock(&self.shared).take();
        if let Some(conn) = taken {
            conn.close().map_err(|(_, e)| e)?;
            tracing::debug!("closed sqlite connection");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        lock(&self.shared).is_none()
    }
}
