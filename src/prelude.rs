//! Convenient imports for common functionality.
//!
//! Brings the facade, the [`Executor`] operations and the mapping traits into
//! scope in one line.

pub use crate::bindings::TypeBindingRegistry;
pub use crate::driver::{Connection, ConnectionSource, IsolationLevel, RowCursor, Statement};
pub use crate::error::{BoxError, SqlStreamsError};
pub use crate::executor::Executor;
pub use crate::mapping::{Args, Constructor, FromRow};
pub use crate::results::{ResultSequence, RowView, group_joined};
pub use crate::sql::Sql;
pub use crate::sql_enum;
pub use crate::sql_param;
pub use crate::transaction::Transaction;
pub use crate::types::{SqlEnum, SqlParam, SqlValue};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteOptions, SqliteOptionsBuilder};
