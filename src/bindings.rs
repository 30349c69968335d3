//! Type-directed conversion table between SQL cells and host types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;

use crate::driver::{RowCursor, Statement};
use crate::error::{BoxError, SqlStreamsError};
use crate::types::{SqlEnum, SqlParam, SqlScalar, SqlValue};

pub(crate) type ErasedValue = Box<dyn Any + Send>;
type IndexReader = Box<dyn Fn(&mut dyn RowCursor, usize) -> Result<ErasedValue, BoxError> + Send + Sync>;
type NameReader = Box<dyn Fn(&mut dyn RowCursor, &str) -> Result<ErasedValue, BoxError> + Send + Sync>;
type Writer = Box<dyn Fn(&mut dyn Statement, usize, &dyn Any) -> Result<(), BoxError> + Send + Sync>;

/// Where a value lives in the current row.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Column<'a> {
    Index(usize),
    Name(&'a str),
}

/// Read/write functions registered for one host type.
pub struct BindingEntry {
    type_name: &'static str,
    read_by_index: IndexReader,
    read_by_name: NameReader,
    write: Writer,
}

impl BindingEntry {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Run the reader for `column`, then mask the result with the cursor's `was_null`.
    pub(crate) fn read(
        &self,
        cursor: &mut dyn RowCursor,
        column: Column<'_>,
    ) -> Result<Option<ErasedValue>, SqlStreamsError> {
        let value = match column {
            Column::Index(index) => (self.read_by_index)(cursor, index)?,
            Column::Name(name) => (self.read_by_name)(cursor, name)?,
        };
        // Readers may hand back a zero value for NULL cells; the cursor signal wins.
        if cursor.was_null() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

impl std::fmt::Debug for BindingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingEntry")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Bidirectional conversion table keyed by host type.
///
/// Built with the builtin scalar kinds; custom types can be added at any time:
/// ```rust
/// use sql_streams::{SqlValue, TypeBindingRegistry};
///
/// #[derive(Debug, PartialEq)]
/// struct Cents(i64);
///
/// let registry = TypeBindingRegistry::new();
/// registry.register::<Cents, _, _, _>(
///     |cursor, index| Ok(Cents(cursor.value(index)?.as_int().unwrap_or_default())),
///     |cursor, name| {
///         let index = cursor.column_index(name)?;
///         Ok(Cents(cursor.value(index)?.as_int().unwrap_or_default()))
///     },
///     |stmt, index, value: &Cents| stmt.bind(index, SqlValue::Int(value.0)),
/// );
/// assert!(registry.supports::<Cents>());
/// ```
pub struct TypeBindingRegistry {
    entries: RwLock<HashMap<TypeId, Arc<BindingEntry>>>,
}

impl Default for TypeBindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeBindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries_read();
        let mut names: Vec<_> = entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("TypeBindingRegistry")
            .field("types", &names)
            .finish()
    }
}

impl TypeBindingRegistry {
    /// Registry preloaded with every builtin scalar kind and [`SqlValue`] itself.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_scalar::<bool>();
        registry.register_scalar::<i8>();
        registry.register_scalar::<i16>();
        registry.register_scalar::<i32>();
        registry.register_scalar::<i64>();
        registry.register_scalar::<f32>();
        registry.register_scalar::<f64>();
        registry.register_scalar::<String>();
        registry.register_scalar::<Vec<u8>>();
        registry.register_scalar::<NaiveDate>();
        registry.register_scalar::<NaiveTime>();
        registry.register_scalar::<NaiveDateTime>();
        registry.register_scalar::<JsonValue>();
        // Raw values pass through untouched, e.g. to bind an explicit NULL.
        registry.register::<SqlValue, _, _, _>(
            |cursor, index| cursor.value(index),
            |cursor, name| {
                let index = cursor.column_index(name)?;
                cursor.value(index)
            },
            |stmt, index, value: &SqlValue| stmt.bind(index, value.clone()),
        );
        registry
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn entries_read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Arc<BindingEntry>>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn entries_write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Arc<BindingEntry>>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Add or overwrite the binding for `T`.
    pub fn register<T, I, N, W>(&self, by_index: I, by_name: N, writer: W)
    where
        T: Send + 'static,
        I: Fn(&mut dyn RowCursor, usize) -> Result<T, BoxError> + Send + Sync + 'static,
        N: Fn(&mut dyn RowCursor, &str) -> Result<T, BoxError> + Send + Sync + 'static,
        W: Fn(&mut dyn Statement, usize, &T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let entry = BindingEntry {
            type_name,
            read_by_index: Box::new(move |cursor: &mut dyn RowCursor, index: usize| {
                by_index(cursor, index).map(|v| Box::new(v) as ErasedValue)
            }),
            read_by_name: Box::new(move |cursor: &mut dyn RowCursor, name: &str| {
                by_name(cursor, name).map(|v| Box::new(v) as ErasedValue)
            }),
            write: Box::new(move |stmt: &mut dyn Statement, index: usize, value: &dyn Any| {
                match value.downcast_ref::<T>() {
                    Some(typed) => writer(stmt, index, typed),
                    None => Err(format!("binding for {type_name} received another type").into()),
                }
            }),
        };
        let replaced = self
            .entries_write()
            .insert(TypeId::of::<T>(), Arc::new(entry));
        if replaced.is_some() {
            tracing::debug!(type_name, "overwrote type binding");
        }
    }

    /// Register a builtin scalar kind through its encode/decode pair.
    pub fn register_scalar<T: SqlScalar>(&self) {
        self.register::<T, _, _, _>(
            |cursor, index| T::decode(cursor.value(index)?),
            |cursor, name| {
                let index = cursor.column_index(name)?;
                T::decode(cursor.value(index)?)
            },
            |stmt, index, value: &T| stmt.bind(index, value.encode()),
        );
    }

    #[must_use]
    pub fn supports<T: 'static>(&self) -> bool {
        self.supports_type(TypeId::of::<T>())
    }

    #[must_use]
    pub fn supports_type(&self, type_id: TypeId) -> bool {
        self.entries_read().contains_key(&type_id)
    }

    pub(crate) fn entry(&self, type_id: TypeId) -> Option<Arc<BindingEntry>> {
        self.entries_read().get(&type_id).cloned()
    }

    fn require_entry<T: 'static>(&self) -> Result<Arc<BindingEntry>, SqlStreamsError> {
        self.entry(TypeId::of::<T>()).ok_or_else(|| {
            SqlStreamsError::config(format!("No binding for {}", std::any::type_name::<T>()))
        })
    }

    /// Read the cell at a 1-based `index` as `T`; `None` for SQL NULL.
    ///
    /// # Errors
    /// `ConfigError` if `T` has no binding, `DriverError` if the cell cannot be read.
    pub fn read<T: 'static>(
        &self,
        cursor: &mut dyn RowCursor,
        index: usize,
    ) -> Result<Option<T>, SqlStreamsError> {
        let entry = self.require_entry::<T>()?;
        downcast_slot(entry.read(cursor, Column::Index(index))?)
    }

    /// Read the cell labelled `name` as `T`; `None` for SQL NULL.
    ///
    /// # Errors
    /// `ConfigError` if `T` has no binding, `DriverError` if the cell cannot be read.
    pub fn read_by_name<T: 'static>(
        &self,
        cursor: &mut dyn RowCursor,
        name: &str,
    ) -> Result<Option<T>, SqlStreamsError> {
        let entry = self.require_entry::<T>()?;
        downcast_slot(entry.read(cursor, Column::Name(name))?)
    }

    /// Bind `value` at a 1-based `index`, dispatching on its runtime type.
    ///
    /// # Errors
    /// `ConfigError` if the runtime type has no binding, `DriverError` if the driver
    /// rejects the value.
    pub fn write(
        &self,
        stmt: &mut dyn Statement,
        index: usize,
        value: &dyn SqlParam,
    ) -> Result<(), SqlStreamsError> {
        if let Some(ordinal) = value.enum_ordinal() {
            let ordinal = i64::try_from(ordinal)
                .map_err(|e| SqlStreamsError::config(format!("enum ordinal too large: {e}")))?;
            stmt.bind(index, SqlValue::Int(ordinal))?;
            return Ok(());
        }

        let any = value.as_any();
        let entry = self.entry(any.type_id()).ok_or_else(|| {
            SqlStreamsError::config(format!("No binding for {}", value.type_name()))
        })?;
        (entry.write)(stmt, index, any)?;
        Ok(())
    }

    /// Bind `params` positionally, the first one at `offset + 1`.
    ///
    /// # Errors
    /// Fails on the first parameter that cannot be written.
    pub fn write_all(
        &self,
        stmt: &mut dyn Statement,
        params: &[&dyn SqlParam],
        offset: usize,
    ) -> Result<(), SqlStreamsError> {
        for (i, param) in params.iter().enumerate() {
            self.write(stmt, offset + i + 1, *param)?;
        }
        Ok(())
    }
}

fn downcast_slot<T: 'static>(slot: Option<ErasedValue>) -> Result<Option<T>, SqlStreamsError> {
    slot.map(|boxed| {
        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            SqlStreamsError::config(format!(
                "binding returned a value that is not {}",
                std::any::type_name::<T>()
            ))
        })
    })
    .transpose()
}

/// Decode an enum from the ordinal stored in a cell. Bypasses the registry.
pub(crate) fn read_ordinal<E: SqlEnum>(
    cursor: &mut dyn RowCursor,
    column: Column<'_>,
) -> Result<Option<E>, SqlStreamsError> {
    let index = match column {
        Column::Index(index) => index,
        Column::Name(name) => cursor.column_index(name)?,
    };
    let value = cursor.value(index)?;
    if cursor.was_null() {
        return Ok(None);
    }
    let ordinal = value
        .as_int()
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| -> BoxError {
            format!("cannot read {value:?} as an ordinal of {}", std::any::type_name::<E>()).into()
        })?;
    let constant = E::from_ordinal(ordinal).ok_or_else(|| -> BoxError {
        format!(
            "ordinal {ordinal} out of range for {} ({} constants)",
            std::any::type_name::<E>(),
            E::CONSTANTS.len()
        )
        .into()
    })?;
    Ok(Some(constant))
}
