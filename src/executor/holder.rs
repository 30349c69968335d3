use crate::driver::{Connection, Statement};
use crate::error::SqlStreamsError;

/// A prepared statement plus, for one-shot use, the connection it was prepared on.
///
/// Releasing closes the statement first and the owned connection second, each at
/// most once. Statements prepared inside a transaction carry no connection; the
/// transaction owns it.
pub struct StatementHolder {
    statement: Option<Box<dyn Statement>>,
    connection: Option<Box<dyn Connection>>,
}

impl std::fmt::Debug for StatementHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementHolder")
            .field("open", &self.statement.is_some())
            .field("owns_connection", &self.connection.is_some())
            .finish()
    }
}

impl StatementHolder {
    pub(crate) fn owned(statement: Box<dyn Statement>, connection: Box<dyn Connection>) -> Self {
        Self {
            statement: Some(statement),
            connection: Some(connection),
        }
    }

    pub(crate) fn shared(statement: Box<dyn Statement>) -> Self {
        Self {
            statement: Some(statement),
            connection: None,
        }
    }

    pub(crate) fn statement(&mut self) -> Result<&mut dyn Statement, SqlStreamsError> {
        match self.statement.as_mut() {
            Some(stmt) => Ok(&mut **stmt),
            None => Err(SqlStreamsError::state("statement already closed")),
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.statement.is_none() && self.connection.is_none()
    }

    /// Close the statement, then the owned connection. Reports the first failure
    /// but always attempts both.
    pub(crate) fn release(&mut self) -> Result<(), SqlStreamsError> {
        let mut first: Option<SqlStreamsError> = None;
        if let Some(mut stmt) = self.statement.take() {
            if let Err(e) = stmt.close() {
                first.get_or_insert(e.into());
            }
        }
        if let Some(mut conn) = self.connection.take() {
            if let Err(e) = conn.close() {
                first.get_or_insert(e.into());
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl Drop for StatementHolder {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release statement");
        }
    }
}
