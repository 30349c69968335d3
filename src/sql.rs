use std::sync::Arc;

use crate::bindings::TypeBindingRegistry;
use crate::driver::{Connection, ConnectionSource, IsolationLevel, RowCursor, Statement};
use crate::error::{BoxError, SqlStreamsError};
use crate::executor::{Executor, SqlContext, StatementHolder};
use crate::mapping::MapperCache;
use crate::pool::{SingleConnectionSource, SuppliedConnections};
use crate::transaction::Transaction;

/// Entry point: a connection source plus the registry and mapper cache every
/// statement uses.
///
/// Cloning is cheap and clones share the source, registry and cache. See
/// [`Executor`] for the statement operations.
///
/// ```rust,ignore
/// use sql_streams::prelude::*;
///
/// let sql = Sql::connect(SqliteOptions::new(":memory:".into()).source());
/// let names: Vec<String> = sql
///     .query("SELECT name FROM users WHERE id > ?", &[&0_i64])?
///     .map(|row| row.require::<String>(1))?
///     .collect::<Result<_, _>>()?;
/// ```
#[derive(Clone)]
pub struct Sql {
    source: Arc<dyn ConnectionSource>,
    ctx: SqlContext,
}

impl std::fmt::Debug for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sql").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}

impl Sql {
    /// Use any connection source.
    pub fn connect<S: ConnectionSource + 'static>(source: S) -> Self {
        Self {
            source: Arc::new(source),
            ctx: SqlContext::default(),
        }
    }

    /// Share one connection, leased to a single statement or transaction at a time.
    pub fn connect_single<C: Connection + 'static>(connection: C) -> Self {
        Self::connect(SingleConnectionSource::new(Box::new(connection)))
    }

    /// Open a fresh connection through `supplier` whenever one is needed.
    pub fn connect_with<F>(supplier: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Connection>, BoxError> + Send + Sync + 'static,
    {
        Self::connect(SuppliedConnections::new(supplier))
    }

    /// Replace the type-binding registry. Drops any compiled mappers.
    #[must_use]
    pub fn with_registry(mut self, registry: TypeBindingRegistry) -> Self {
        self.ctx = SqlContext::new(registry);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &TypeBindingRegistry {
        self.ctx.registry()
    }

    #[must_use]
    pub fn mappers(&self) -> &MapperCache {
        self.ctx.mappers()
    }

    /// Add or overwrite a binding, see [`TypeBindingRegistry::register`].
    pub fn register<T, I, N, W>(&self, by_index: I, by_name: N, writer: W)
    where
        T: Send + 'static,
        I: Fn(&mut dyn RowCursor, usize) -> Result<T, BoxError> + Send + Sync + 'static,
        N: Fn(&mut dyn RowCursor, &str) -> Result<T, BoxError> + Send + Sync + 'static,
        W: Fn(&mut dyn Statement, usize, &T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.ctx.registry().register(by_index, by_name, writer);
    }

    /// Start a transaction on a connection of its own.
    ///
    /// # Errors
    /// Whatever the source reports, or `DriverError` if auto-commit cannot be disabled.
    pub fn transaction(&self) -> Result<Transaction, SqlStreamsError> {
        Transaction::begin(self.source.get_connection()?, self.ctx.clone(), None)
    }

    /// # Errors
    /// As [`Sql::transaction`], plus `DriverError` if the level is rejected.
    pub fn transaction_with(&self, level: IsolationLevel) -> Result<Transaction, SqlStreamsError> {
        Transaction::begin(self.source.get_connection()?, self.ctx.clone(), Some(level))
    }

    /// Close the connection source.
    ///
    /// # Errors
    /// Whatever the source reports.
    pub fn close(&self) -> Result<(), SqlStreamsError> {
        self.source.close()
    }
}

impl Executor for Sql {
    fn context(&self) -> &SqlContext {
        &self.ctx
    }

    fn open(&self, sql: &str) -> Result<StatementHolder, SqlStreamsError> {
        let mut conn = self.source.get_connection()?;
        match conn.prepare(sql) {
            Ok(stmt) => Ok(StatementHolder::owned(stmt, conn)),
            Err(e) => {
                if let Err(close_err) = conn.close() {
                    tracing::warn!(error = %close_err, "failed to close connection after prepare error");
                }
                Err(e.into())
            }
        }
    }
}
