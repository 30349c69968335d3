use crate::bindings::{Column, TypeBindingRegistry, read_ordinal};
use crate::driver::RowCursor;
use crate::error::SqlStreamsError;
use crate::types::{SqlEnum, SqlValue};

/// The cursor's current row, as seen by a mapping function.
///
/// Reads go through the type-binding registry, so any registered type can be
/// pulled out by index or column label. A `RowView` is only valid for the
/// duration of one mapping call.
pub struct RowView<'a> {
    cursor: &'a mut dyn RowCursor,
    registry: &'a TypeBindingRegistry,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(cursor: &'a mut dyn RowCursor, registry: &'a TypeBindingRegistry) -> Self {
        Self { cursor, registry }
    }

    pub(crate) fn cursor(&mut self) -> &mut dyn RowCursor {
        &mut *self.cursor
    }

    pub(crate) fn registry(&self) -> &'a TypeBindingRegistry {
        self.registry
    }

    /// Get a value by 1-based column index
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the cell is SQL NULL
    ///
    /// # Errors
    ///
    /// `ConfigError` if `T` has no binding, `DriverError` if the cell cannot be read
    pub fn get<T: 'static>(&mut self, index: usize) -> Result<Option<T>, SqlStreamsError> {
        self.registry.read::<T>(&mut *self.cursor, index)
    }

    /// Get a value by column label
    ///
    /// # Errors
    ///
    /// `ConfigError` if `T` has no binding, `DriverError` if the label is unknown
    pub fn get_by_name<T: 'static>(&mut self, name: &str) -> Result<Option<T>, SqlStreamsError> {
        self.registry.read_by_name::<T>(&mut *self.cursor, name)
    }

    /// Like [`RowView::get`], failing instead of returning `None` on NULL.
    ///
    /// # Errors
    ///
    /// As [`RowView::get`], plus `DriverError` when the cell is NULL
    pub fn require<T: 'static>(&mut self, index: usize) -> Result<T, SqlStreamsError> {
        self.get::<T>(index)?.ok_or_else(|| {
            SqlStreamsError::DriverError(
                format!(
                    "column {index} is NULL, expected {}",
                    std::any::type_name::<T>()
                )
                .into(),
            )
        })
    }

    /// Decode an enum stored as its ordinal.
    ///
    /// # Errors
    ///
    /// `DriverError` if the cell is not a valid ordinal of `E`
    pub fn get_enum<E: SqlEnum>(&mut self, index: usize) -> Result<Option<E>, SqlStreamsError> {
        read_ordinal::<E>(&mut *self.cursor, Column::Index(index))
    }

    /// # Errors
    ///
    /// `DriverError` if the label is unknown or the cell is not a valid ordinal of `E`
    pub fn get_enum_by_name<E: SqlEnum>(&mut self, name: &str) -> Result<Option<E>, SqlStreamsError> {
        read_ordinal::<E>(&mut *self.cursor, Column::Name(name))
    }

    /// The raw cell, bypassing the registry.
    ///
    /// # Errors
    ///
    /// `DriverError` if the cell cannot be read
    pub fn value(&mut self, index: usize) -> Result<SqlValue, SqlStreamsError> {
        Ok(self.cursor.value(index)?)
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.cursor.column_count()
    }

    /// # Errors
    ///
    /// `DriverError` if no column carries `name`
    pub fn column_index(&self, name: &str) -> Result<usize, SqlStreamsError> {
        Ok(self.cursor.column_index(name)?)
    }
}
