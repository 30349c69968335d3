//! Connection sources shipped with the library.

mod single;
mod supplied;

pub use single::{LeasedConnection, SingleConnectionSource};
pub use supplied::SuppliedConnections;
