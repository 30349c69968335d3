use crate::driver::{Connection, ConnectionSource};
use crate::error::{BoxError, SqlStreamsError};

/// Connection source backed by a caller-supplied function. Each call opens a fresh
/// connection, which is closed for real when the statement using it is done.
pub struct SuppliedConnections<F> {
    supplier: F,
}

impl<F> SuppliedConnections<F>
where
    F: Fn() -> Result<Box<dyn Connection>, BoxError> + Send + Sync,
{
    pub fn new(supplier: F) -> Self {
        Self { supplier }
    }
}

impl<F> std::fmt::Debug for SuppliedConnections<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuppliedConnections").finish_non_exhaustive()
    }
}

impl<F> ConnectionSource for SuppliedConnections<F>
where
    F: Fn() -> Result<Box<dyn Connection>, BoxError> + Send + Sync,
{
    fn get_connection(&self) -> Result<Box<dyn Connection>, SqlStreamsError> {
        Ok((self.supplier)()?)
    }
}
