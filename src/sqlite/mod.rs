// SQLite driver - a reference implementation of the driver traits over rusqlite
//
// - config: connection options, builder and a per-request connection source
// - connection: auto-commit emulation on top of BEGIN/COMMIT/ROLLBACK
// - params: value conversion between SqlValue and rusqlite
// - query: statements and buffered cursors

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder, SqliteSource};
pub use connection::SqliteConnection;
pub use query::{SqliteCursor, SqliteStatement};
