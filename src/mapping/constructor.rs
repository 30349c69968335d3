use std::any::TypeId;
use std::sync::Arc;

use crate::bindings::{Column, ErasedValue, read_ordinal};
use crate::driver::RowCursor;
use crate::error::{BoxError, SqlStreamsError};
use crate::types::SqlEnum;

/// A type that can be built from one row.
///
/// Implementors list the factories a row may be mapped through. With a single
/// constructor it is always used; with several, exactly one must be marked with
/// [`Constructor::mapping`] for implicit mapping.
///
/// ```rust
/// use sql_streams::{Constructor, FromRow};
///
/// struct Post {
///     id: i64,
///     user_id: i64,
///     content: Option<String>,
/// }
///
/// impl FromRow for Post {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![
///             Constructor::new("Post::new", |args| {
///                 Ok(Post {
///                     id: args.take()?,
///                     user_id: args.take()?,
///                     content: args.take_opt()?,
///                 })
///             })
///             .param::<i64>()
///             .param::<i64>()
///             .param::<String>(),
///         ]
///     }
/// }
/// ```
pub trait FromRow: Sized + Send + 'static {
    fn constructors() -> Vec<Constructor<Self>>;
}

pub(crate) type EnumReader =
    fn(&mut dyn RowCursor, Column<'_>) -> Result<Option<ErasedValue>, SqlStreamsError>;

fn read_enum_slot<E: SqlEnum>(
    cursor: &mut dyn RowCursor,
    column: Column<'_>,
) -> Result<Option<ErasedValue>, SqlStreamsError> {
    Ok(read_ordinal::<E>(cursor, column)?.map(|e| Box::new(e) as ErasedValue))
}

/// Declared type of one constructor parameter.
#[derive(Clone)]
pub struct ParamType {
    type_id: TypeId,
    type_name: &'static str,
    enum_reader: Option<EnumReader>,
}

impl ParamType {
    /// A parameter resolved through the type-binding registry.
    #[must_use]
    pub fn bound<T: Send + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            enum_reader: None,
        }
    }

    /// A parameter decoded from an ordinal, bypassing the registry.
    #[must_use]
    pub fn enumeration<E: SqlEnum>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
            enum_reader: Some(read_enum_slot::<E>),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.enum_reader.is_some()
    }

    pub(crate) fn enum_reader(&self) -> Option<EnumReader> {
        self.enum_reader
    }
}

impl std::fmt::Debug for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}

type Factory<T> = Arc<dyn Fn(&mut Args) -> Result<T, BoxError> + Send + Sync>;

/// An explicit factory for `T` together with its parameter types.
pub struct Constructor<T> {
    name: &'static str,
    params: Vec<ParamType>,
    marked: bool,
    factory: Factory<T>,
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            params: self.params.clone(),
            marked: self.marked,
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> std::fmt::Debug for Constructor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:?}", self.name, self.params)
    }
}

impl<T: 'static> Constructor<T> {
    /// `name` is only used in error messages.
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            name,
            params: Vec::new(),
            marked: false,
            factory: Arc::new(factory),
        }
    }

    /// Append a registry-bound parameter.
    #[must_use]
    pub fn param<P: Send + 'static>(mut self) -> Self {
        self.params.push(ParamType::bound::<P>());
        self
    }

    /// Append an enum parameter stored as its ordinal.
    #[must_use]
    pub fn enum_param<E: SqlEnum>(mut self) -> Self {
        self.params.push(ParamType::enumeration::<E>());
        self
    }

    /// Mark this constructor as the one implicit mapping should use.
    #[must_use]
    pub fn mapping(mut self) -> Self {
        self.marked = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_mapping(&self) -> bool {
        self.marked
    }

    pub(crate) fn instantiate(&self, values: Vec<Option<ErasedValue>>) -> Result<T, SqlStreamsError> {
        let mut args = Args {
            constructor: self.name,
            values,
            position: 0,
        };
        (self.factory)(&mut args).map_err(|source| SqlStreamsError::InstantiationError {
            target: self.name,
            source,
        })
    }
}

/// Positional values handed to a constructor factory. `None` slots are SQL NULLs.
pub struct Args {
    constructor: &'static str,
    values: Vec<Option<ErasedValue>>,
    position: usize,
}

impl Args {
    /// Take the next value, failing on NULL.
    ///
    /// # Errors
    /// Fails if the slot is NULL, already consumed, or holds another type.
    pub fn take<V: 'static>(&mut self) -> Result<V, BoxError> {
        let position = self.position;
        self.take_opt()?.ok_or_else(|| {
            format!(
                "{}: parameter {position} is NULL but {} is not nullable",
                self.constructor,
                std::any::type_name::<V>()
            )
            .into()
        })
    }

    /// Take the next value, mapping NULL to `None`.
    ///
    /// # Errors
    /// Fails if every value was already consumed or the slot holds another type.
    pub fn take_opt<V: 'static>(&mut self) -> Result<Option<V>, BoxError> {
        let position = self.position;
        let available = self.values.len();
        let constructor = self.constructor;
        let slot = self.values.get_mut(position).ok_or_else(|| -> BoxError {
            format!("{constructor}: only {available} parameters available").into()
        })?;
        self.position += 1;
        match slot.take() {
            None => Ok(None),
            Some(boxed) => boxed.downcast::<V>().map(|v| Some(*v)).map_err(|_| {
                format!(
                    "{constructor}: parameter {position} is not a {}",
                    std::any::type_name::<V>()
                )
                .into()
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.position)
    }
}
