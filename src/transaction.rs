use std::sync::{Mutex, MutexGuard};

use crate::driver::{Connection, IsolationLevel};
use crate::error::{BoxError, SqlStreamsError};
use crate::executor::{Executor, SqlContext, StatementHolder};

/// A unit of work on one connection with auto-commit off.
///
/// Every statement created through the transaction shares its connection and leaves
/// it open. Nothing is committed unless [`Transaction::commit`] is called: closing
/// or dropping the transaction rolls back whatever is pending and then closes the
/// connection.
///
/// # Examples
///
/// ```rust,ignore
/// let tx = sql.transaction()?;
/// tx.count("INSERT INTO users (name) VALUES (?)", &[&name])?;
/// tx.commit()?;
/// tx.close()?;
/// ```
pub struct Transaction {
    connection: Mutex<Option<Box<dyn Connection>>>,
    ctx: SqlContext,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Transaction {
    pub(crate) fn begin(
        mut connection: Box<dyn Connection>,
        ctx: SqlContext,
        isolation: Option<IsolationLevel>,
    ) -> Result<Self, SqlStreamsError> {
        let started = (|| -> Result<(), BoxError> {
            if let Some(level) = isolation {
                connection.set_isolation_level(level)?;
            }
            connection.set_auto_commit(false)
        })();
        if let Err(e) = started {
            if let Err(close_err) = connection.close() {
                tracing::warn!(error = %close_err, "failed to close connection after failed begin");
            }
            return Err(e.into());
        }
        tracing::debug!(?isolation, "transaction started");
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            ctx,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn Connection>>> {
        match self.connection.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut dyn Connection) -> Result<R, BoxError>,
    ) -> Result<R, SqlStreamsError> {
        let mut guard = self.lock();
        match guard.as_mut() {
            Some(conn) => Ok(f(&mut **conn)?),
            None => Err(SqlStreamsError::state("transaction already closed")),
        }
    }

    /// Commit pending work. The transaction stays usable.
    ///
    /// # Errors
    /// `DriverError` if the commit fails, `StateError` once closed.
    pub fn commit(&self) -> Result<&Self, SqlStreamsError> {
        self.with_connection(|c| c.commit())?;
        tracing::debug!("transaction committed");
        Ok(self)
    }

    /// Discard pending work. The transaction stays usable.
    ///
    /// # Errors
    /// `DriverError` if the rollback fails, `StateError` once closed.
    pub fn rollback(&self) -> Result<&Self, SqlStreamsError> {
        self.with_connection(|c| c.rollback())?;
        tracing::debug!("transaction rolled back");
        Ok(self)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Roll back anything uncommitted, then close the connection.
    ///
    /// # Errors
    /// The first failure of the two steps; the close is attempted regardless.
    pub fn close(self) -> Result<(), SqlStreamsError> {
        self.finish()
    }

    fn finish(&self) -> Result<(), SqlStreamsError> {
        let Some(mut conn) = self.lock().take() else {
            return Ok(());
        };
        let rolled_back = conn.rollback();
        let closed = conn.close();
        tracing::debug!("transaction closed");
        rolled_back.and(closed).map_err(SqlStreamsError::from)
    }
}

impl Executor for Transaction {
    fn context(&self) -> &SqlContext {
        &self.ctx
    }

    fn open(&self, sql: &str) -> Result<StatementHolder, SqlStreamsError> {
        let stmt = self.with_connection(|c| c.prepare(sql))?;
        Ok(StatementHolder::shared(stmt))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::warn!(error = %e, "failed to close transaction");
        }
    }
}
