use crate::driver::Statement;
use crate::error::{BoxError, SqlStreamsError};
use crate::mapping::{FromRow, Selector, combine};
use crate::results::{ResultSequence, RowView};
use crate::types::SqlParam;

use super::SqlContext;
use super::holder::StatementHolder;

/// Parameter setters shared by every statement builder.
macro_rules! parameter_setters {
    ($builder:ident) => {
        impl $builder {
            pub(crate) fn new(holder: StatementHolder, ctx: SqlContext) -> Self {
                Self { holder, ctx }
            }

            /// Bind `params` positionally, the first at index 1.
            ///
            /// # Errors
            /// `ConfigError` if a parameter's type has no binding, `DriverError` if
            /// the driver rejects a value.
            pub fn with(mut self, params: &[&dyn SqlParam]) -> Result<Self, SqlStreamsError> {
                self.ctx
                    .registry()
                    .write_all(self.holder.statement()?, params, 0)?;
                Ok(self)
            }

            /// Bind one parameter at a 1-based `index`.
            ///
            /// # Errors
            /// As [`Self::with`].
            pub fn set(mut self, index: usize, value: &dyn SqlParam) -> Result<Self, SqlStreamsError> {
                self.ctx
                    .registry()
                    .write(self.holder.statement()?, index, value)?;
                Ok(self)
            }

            /// Hand the raw statement to `f`, e.g. to bind values the registry
            /// does not know about.
            ///
            /// # Errors
            /// Whatever `f` reports, wrapped as a driver error.
            pub fn prepare<F>(mut self, f: F) -> Result<Self, SqlStreamsError>
            where
                F: FnOnce(&mut dyn Statement) -> Result<(), BoxError>,
            {
                f(self.holder.statement()?)?;
                Ok(self)
            }
        }
    };
}

/// A SELECT whose rows are mapped lazily.
#[derive(Debug)]
pub struct Query {
    holder: StatementHolder,
    ctx: SqlContext,
}

parameter_setters!(Query);

impl Query {
    /// Execute and map every row through `mapping`.
    ///
    /// # Errors
    /// `DriverError` if the query cannot be executed.
    pub fn map<R, F>(self, mapping: F) -> Result<ResultSequence<R>, SqlStreamsError>
    where
        F: FnMut(&mut RowView<'_>) -> Result<R, SqlStreamsError> + Send + 'static,
    {
        let Query { mut holder, ctx } = self;
        let cursor = holder.statement()?.execute_query()?;
        Ok(ResultSequence::new(cursor, holder, ctx.shared_registry(), mapping))
    }

    /// Map rows to `T` through its implicit constructor, column `i` feeding
    /// parameter `i`.
    ///
    /// # Errors
    /// `ConfigError` if `T` cannot be mapped; the query is not executed.
    pub fn map_to<T: FromRow>(self) -> Result<ResultSequence<T>, SqlStreamsError> {
        self.map_selected(Selector::Implicit)
    }

    /// Map rows to `T` through the constructor whose arity matches `names`, feeding
    /// parameter `i` from the column labelled `names[i]`.
    ///
    /// # Errors
    /// `ConfigError` if `T` cannot be mapped; the query is not executed.
    pub fn map_to_names<T: FromRow>(
        self,
        names: &[&str],
    ) -> Result<ResultSequence<T>, SqlStreamsError> {
        let names = names.iter().map(|n| (*n).to_string()).collect();
        self.map_selected(Selector::Names(names))
    }

    /// Map rows to `T` through the constructor whose arity matches `indices`,
    /// feeding parameter `i` from the 1-based column `indices[i]`.
    ///
    /// # Errors
    /// `ConfigError` if `T` cannot be mapped; the query is not executed.
    pub fn map_to_indices<T: FromRow>(
        self,
        indices: &[usize],
    ) -> Result<ResultSequence<T>, SqlStreamsError> {
        self.map_selected(Selector::Indices(indices.to_vec()))
    }

    /// Map each row of a join into `(L, R)`: `L` reads the leading columns, `R` the
    /// columns right after them.
    ///
    /// # Errors
    /// `ConfigError` if either side cannot be mapped; the query is not executed.
    pub fn map_joining<L: FromRow, R: FromRow>(
        self,
    ) -> Result<ResultSequence<(L, R)>, SqlStreamsError> {
        let left = self
            .ctx
            .mappers()
            .get_or_compile::<L>(self.ctx.registry(), Selector::Implicit)?;
        let right = self
            .ctx
            .mappers()
            .get_or_compile::<R>(self.ctx.registry(), Selector::Implicit)?;
        self.map(move |row: &mut RowView<'_>| {
            let registry = row.registry();
            combine(&*left, &*right, registry, row.cursor())
        })
    }

    /// Map only the first row, then release everything.
    ///
    /// # Errors
    /// As [`Query::map`], plus whatever mapping the first row reports.
    pub fn first<R, F>(self, mapping: F) -> Result<Option<R>, SqlStreamsError>
    where
        F: FnMut(&mut RowView<'_>) -> Result<R, SqlStreamsError> + Send + 'static,
    {
        let mut rows = self.map(mapping)?;
        let first = rows.next().transpose()?;
        rows.close()?;
        Ok(first)
    }

    /// # Errors
    /// As [`Query::map_to`] and [`Query::first`].
    pub fn first_to<T: FromRow>(self) -> Result<Option<T>, SqlStreamsError> {
        let mut rows = self.map_to::<T>()?;
        let first = rows.next().transpose()?;
        rows.close()?;
        Ok(first)
    }

    fn map_selected<T: FromRow>(
        self,
        selector: Selector,
    ) -> Result<ResultSequence<T>, SqlStreamsError> {
        let mapper = self
            .ctx
            .mappers()
            .get_or_compile::<T>(self.ctx.registry(), selector)?;
        self.map(move |row: &mut RowView<'_>| {
            let registry = row.registry();
            mapper.map_row(registry, row.cursor())
        })
    }
}

/// An INSERT/UPDATE/DELETE reporting its affected row count.
#[derive(Debug)]
pub struct Update {
    holder: StatementHolder,
    ctx: SqlContext,
}

parameter_setters!(Update);

impl Update {
    /// Execute and release the statement.
    ///
    /// # Errors
    /// `DriverError` if execution or release fails.
    pub fn count(mut self) -> Result<u64, SqlStreamsError> {
        let count = self.holder.statement()?.execute_update()?;
        self.holder.release()?;
        tracing::debug!(count, "update executed");
        Ok(count)
    }
}

/// An update whose generated keys can be read back.
#[derive(Debug)]
pub struct UpdateReturning {
    holder: StatementHolder,
    ctx: SqlContext,
}

parameter_setters!(UpdateReturning);

impl UpdateReturning {
    /// # Errors
    /// `DriverError` if execution or release fails.
    pub fn count(mut self) -> Result<u64, SqlStreamsError> {
        let count = self.holder.statement()?.execute_update()?;
        self.holder.release()?;
        Ok(count)
    }

    /// Execute, then map the generated keys lazily.
    ///
    /// # Errors
    /// `DriverError` if execution fails or keys cannot be retrieved.
    pub fn generated<R, F>(self, mapping: F) -> Result<ResultSequence<R>, SqlStreamsError>
    where
        F: FnMut(&mut RowView<'_>) -> Result<R, SqlStreamsError> + Send + 'static,
    {
        let UpdateReturning { mut holder, ctx } = self;
        let stmt = holder.statement()?;
        let count = stmt.execute_update()?;
        let keys = stmt.generated_keys()?;
        tracing::debug!(count, "update executed, reading generated keys");
        Ok(ResultSequence::new(keys, holder, ctx.shared_registry(), mapping))
    }

    /// Execute, then map the generated keys to `T`.
    ///
    /// # Errors
    /// `ConfigError` if `T` cannot be mapped; the update is not executed.
    pub fn generated_to<T: FromRow>(self) -> Result<ResultSequence<T>, SqlStreamsError> {
        let mapper = self
            .ctx
            .mappers()
            .get_or_compile::<T>(self.ctx.registry(), Selector::Implicit)?;
        self.generated(move |row: &mut RowView<'_>| {
            let registry = row.registry();
            mapper.map_row(registry, row.cursor())
        })
    }
}

/// Arbitrary SQL.
#[derive(Debug)]
pub struct Execute {
    holder: StatementHolder,
    ctx: SqlContext,
}

parameter_setters!(Execute);

impl Execute {
    /// Run the statement and release it; `true` if it produced a result set.
    ///
    /// # Errors
    /// `DriverError` if execution or release fails.
    pub fn execute(mut self) -> Result<bool, SqlStreamsError> {
        let produced_rows = self.holder.statement()?.execute()?;
        self.holder.release()?;
        Ok(produced_rows)
    }
}

/// One statement run for many parameter sets.
///
/// ```rust,ignore
/// let counts = sql
///     .batch_update("INSERT INTO users (name) VALUES (?)")?
///     .with(&[&"ann".to_string()])?
///     .end_batch()?
///     .with(&[&"bob".to_string()])?
///     .end_batch()?
///     .counts()?;
/// ```
#[derive(Debug)]
pub struct BatchUpdate {
    holder: StatementHolder,
    ctx: SqlContext,
}

parameter_setters!(BatchUpdate);

impl BatchUpdate {
    /// Add the currently bound parameters as one batch entry.
    ///
    /// # Errors
    /// `DriverError` if the driver rejects the entry.
    pub fn end_batch(mut self) -> Result<Self, SqlStreamsError> {
        self.holder.statement()?.add_batch()?;
        Ok(self)
    }

    /// Execute every entry and release the statement; one count per entry.
    ///
    /// # Errors
    /// `DriverError` if execution or release fails.
    pub fn counts(mut self) -> Result<Vec<u64>, SqlStreamsError> {
        let counts = self.holder.statement()?.execute_batch()?;
        self.holder.release()?;
        tracing::debug!(entries = counts.len(), "batch executed");
        Ok(counts)
    }

    /// Total affected rows across the batch.
    ///
    /// # Errors
    /// As [`BatchUpdate::counts`].
    pub fn count(self) -> Result<u64, SqlStreamsError> {
        Ok(self.counts()?.iter().sum())
    }
}
