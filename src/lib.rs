//! Stream SQL query results as lazily mapped Rust values.
//!
//! The library sits on top of a synchronous driver described by the traits in
//! [`driver`]. Statements are built through [`Sql`] (one connection per
//! statement) or a [`Transaction`] (one shared connection), parameters are bound
//! through a [`TypeBindingRegistry`], and rows come back as a [`ResultSequence`]
//! that maps each row on demand and releases the cursor, statement and
//! connection as soon as it is exhausted, closed or dropped.
//!
//! ```rust
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> Result<(), sql_streams::SqlStreamsError> {
//! use sql_streams::prelude::*;
//!
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl FromRow for User {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![
//!             Constructor::new("User", |args| {
//!                 Ok(User { id: args.take()?, name: args.take()? })
//!             })
//!             .param::<i64>()
//!             .param::<String>(),
//!         ]
//!     }
//! }
//!
//! let sql = Sql::connect_single(SqliteConnection::open_in_memory()?);
//! sql.exec("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
//! sql.count("INSERT INTO users (name) VALUES (?)", &[&"alice".to_string()])?;
//!
//! let users: Vec<User> = sql
//!     .query("SELECT id, name FROM users", &[])?
//!     .map_to::<User>()?
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(users[0].name, "alice");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

pub mod bindings;
pub mod driver;
pub mod error;
pub mod executor;
mod macros;
pub mod mapping;
pub mod pool;
pub mod prelude;
pub mod results;
mod sql;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod transaction;
pub mod types;

pub use bindings::{BindingEntry, TypeBindingRegistry};
pub use driver::{Connection, ConnectionSource, IsolationLevel, RowCursor, Statement};
pub use error::{BoxError, SqlStreamsError};
pub use executor::{BatchUpdate, Execute, Executor, Query, SqlContext, Update, UpdateReturning};
pub use mapping::{Args, Constructor, FromRow, MapperCache, RowMapper, Selector};
pub use pool::{LeasedConnection, SingleConnectionSource, SuppliedConnections};
pub use results::{ResultSequence, RowView};
pub use sql::Sql;
pub use transaction::Transaction;
pub use types::{ScalarKind, SqlEnum, SqlParam, SqlScalar, SqlValue};
