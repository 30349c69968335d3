//! Narrow interfaces to the externally supplied driver.
//!
//! The library never talks to a database directly. It prepares statements,
//! binds parameters, pulls rows and manages transactions exclusively through
//! these traits. Column indices are 1-based throughout, matching SQL
//! placeholder numbering.

use serde::{Deserialize, Serialize};

use crate::error::{BoxError, SqlStreamsError};
use crate::types::SqlValue;

/// Transaction isolation levels a driver may be asked to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Supplies raw connections on request.
pub trait ConnectionSource: Send + Sync {
    /// Obtain a connection. One-shot statements close it when they are done.
    ///
    /// # Errors
    /// Returns `SqlStreamsError` if no connection can be produced.
    fn get_connection(&self) -> Result<Box<dyn Connection>, SqlStreamsError>;

    /// Release whatever the source itself holds.
    ///
    /// # Errors
    /// Returns `SqlStreamsError` if shutting the source down fails.
    fn close(&self) -> Result<(), SqlStreamsError> {
        Ok(())
    }
}

/// A physical (or intercepted) database connection.
pub trait Connection: Send {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>, BoxError>;

    fn auto_commit(&self) -> Result<bool, BoxError>;

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), BoxError>;

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), BoxError>;

    fn commit(&mut self) -> Result<(), BoxError>;

    fn rollback(&mut self) -> Result<(), BoxError>;

    fn close(&mut self) -> Result<(), BoxError>;

    fn is_closed(&self) -> bool;
}

/// A prepared statement. Owns its parameter buffer; does not borrow the connection.
pub trait Statement: Send {
    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), BoxError>;

    /// Run the statement; `true` if it produced a result set.
    fn execute(&mut self) -> Result<bool, BoxError>;

    /// Run a DML statement and report the affected row count.
    fn execute_update(&mut self) -> Result<u64, BoxError>;

    fn execute_query(&mut self) -> Result<Box<dyn RowCursor>, BoxError>;

    /// Snapshot the currently bound parameters as one batch entry.
    fn add_batch(&mut self) -> Result<(), BoxError>;

    fn execute_batch(&mut self) -> Result<Vec<u64>, BoxError>;

    /// Keys generated by the last executed update.
    fn generated_keys(&mut self) -> Result<Box<dyn RowCursor>, BoxError>;

    fn close(&mut self) -> Result<(), BoxError>;
}

/// Forward-only, single-pass cursor over a query's rows.
pub trait RowCursor: Send {
    /// Move to the next row; `false` once exhausted.
    fn next_row(&mut self) -> Result<bool, BoxError>;

    fn column_count(&self) -> usize;

    /// Resolve a column label to its 1-based index.
    fn column_index(&self, name: &str) -> Result<usize, BoxError>;

    /// Read a cell of the current row. Updates the `was_null` signal.
    fn value(&mut self, index: usize) -> Result<SqlValue, BoxError>;

    /// Whether the last cell read was SQL NULL.
    fn was_null(&self) -> bool;

    fn close(&mut self) -> Result<(), BoxError>;
}
