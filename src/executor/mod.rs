//! Statement builders and the operations shared by the facade and transactions.

mod builders;
mod holder;

use std::sync::Arc;

pub use builders::{BatchUpdate, Execute, Query, Update, UpdateReturning};
pub use holder::StatementHolder;

use crate::bindings::TypeBindingRegistry;
use crate::error::SqlStreamsError;
use crate::mapping::{FromRow, MapperCache};
use crate::types::SqlParam;

/// Registry and mapper cache shared by a facade and every scope derived from it.
#[derive(Debug, Clone, Default)]
pub struct SqlContext {
    registry: Arc<TypeBindingRegistry>,
    mappers: Arc<MapperCache>,
}

impl SqlContext {
    #[must_use]
    pub fn new(registry: TypeBindingRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            mappers: Arc::new(MapperCache::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TypeBindingRegistry {
        &self.registry
    }

    #[must_use]
    pub fn mappers(&self) -> &MapperCache {
        &self.mappers
    }

    pub(crate) fn shared_registry(&self) -> Arc<TypeBindingRegistry> {
        Arc::clone(&self.registry)
    }
}

/// Statement factory operations, available on [`crate::Sql`] and
/// [`crate::Transaction`] alike.
///
/// On the facade each statement runs on a connection of its own, closed together
/// with the statement. Inside a transaction every statement shares the
/// transaction's connection.
pub trait Executor {
    #[doc(hidden)]
    fn context(&self) -> &SqlContext;

    /// Prepare `sql` on whatever connection this executor uses.
    #[doc(hidden)]
    fn open(&self, sql: &str) -> Result<StatementHolder, SqlStreamsError>;

    /// # Errors
    /// `DriverError` if preparing fails, `ConfigError` if a parameter cannot be bound.
    fn query(&self, sql: &str, params: &[&dyn SqlParam]) -> Result<Query, SqlStreamsError> {
        Query::new(self.open(sql)?, self.context().clone()).with(params)
    }

    /// # Errors
    /// `DriverError` if preparing fails, `ConfigError` if a parameter cannot be bound.
    fn update(&self, sql: &str, params: &[&dyn SqlParam]) -> Result<Update, SqlStreamsError> {
        Update::new(self.open(sql)?, self.context().clone()).with(params)
    }

    /// # Errors
    /// `DriverError` if preparing fails, `ConfigError` if a parameter cannot be bound.
    fn update_returning(
        &self,
        sql: &str,
        params: &[&dyn SqlParam],
    ) -> Result<UpdateReturning, SqlStreamsError> {
        UpdateReturning::new(self.open(sql)?, self.context().clone()).with(params)
    }

    /// # Errors
    /// `DriverError` if preparing fails, `ConfigError` if a parameter cannot be bound.
    fn execute(&self, sql: &str, params: &[&dyn SqlParam]) -> Result<Execute, SqlStreamsError> {
        Execute::new(self.open(sql)?, self.context().clone()).with(params)
    }

    /// # Errors
    /// `DriverError` if preparing fails.
    fn batch_update(&self, sql: &str) -> Result<BatchUpdate, SqlStreamsError> {
        Ok(BatchUpdate::new(self.open(sql)?, self.context().clone()))
    }

    /// Run parameterless SQL such as DDL.
    ///
    /// # Errors
    /// `DriverError` if the statement fails.
    fn exec(&self, sql: &str) -> Result<bool, SqlStreamsError> {
        self.execute(sql, &[])?.execute()
    }

    /// Run an update and return its affected row count.
    ///
    /// # Errors
    /// As [`Executor::update`] and [`Update::count`].
    fn count(&self, sql: &str, params: &[&dyn SqlParam]) -> Result<u64, SqlStreamsError> {
        self.update(sql, params)?.count()
    }

    /// Map the first row of a query to `T`.
    ///
    /// # Errors
    /// As [`Executor::query`] and [`Query::first_to`].
    fn first<T: FromRow>(
        &self,
        sql: &str,
        params: &[&dyn SqlParam],
    ) -> Result<Option<T>, SqlStreamsError>
    where
        Self: Sized,
    {
        self.query(sql, params)?.first_to::<T>()
    }
}
