use std::any::TypeId;

use crate::bindings::{Column, ErasedValue, TypeBindingRegistry};
use crate::driver::RowCursor;
use crate::error::SqlStreamsError;

use super::constructor::{Constructor, EnumReader, FromRow};

/// How constructor parameters are matched to result columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Parameter `i` reads column `offset + i` (1-based).
    Implicit,
    /// Pick the constructor by arity; parameter `i` reads column `indices[i]`.
    Indices(Vec<usize>),
    /// Pick the constructor by arity; parameter `i` reads the column labelled `names[i]`.
    Names(Vec<String>),
}

impl Selector {
    fn arity(&self) -> Option<usize> {
        match self {
            Selector::Implicit => None,
            Selector::Indices(indices) => Some(indices.len()),
            Selector::Names(names) => Some(names.len()),
        }
    }
}

// Bound readers are looked up per row so a later `register` takes effect.
enum Reader {
    Bound {
        type_id: TypeId,
        type_name: &'static str,
    },
    Ordinal(EnumReader),
}

enum Source {
    Position(usize),
    Index(usize),
    Name(String),
}

struct Slot {
    reader: Reader,
    source: Source,
}

/// Compiled plan turning the current row into a `T`.
///
/// Everything that can be checked without a row (constructor choice, parameter
/// support) is checked when the mapper is built. Cells are converted with the
/// registry's current bindings at mapping time.
pub struct RowMapper<T> {
    constructor: Constructor<T>,
    selector: Selector,
    slots: Vec<Slot>,
}

impl<T> std::fmt::Debug for RowMapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowMapper")
            .field("constructor", &self.constructor)
            .field("selector", &self.selector)
            .finish()
    }
}

impl<T: FromRow> RowMapper<T> {
    /// Select a constructor for `T` and resolve how each parameter is read.
    ///
    /// # Errors
    /// `ConfigError` when no single constructor qualifies, or a parameter type has
    /// no binding and is not an enum.
    pub fn compile(
        registry: &TypeBindingRegistry,
        selector: Selector,
    ) -> Result<Self, SqlStreamsError> {
        let target = std::any::type_name::<T>();
        let constructor = select_constructor(target, T::constructors(), selector.arity())?;

        let unsupported: Vec<&'static str> = constructor
            .params()
            .iter()
            .filter(|p| !p.is_enum() && !registry.supports_type(p.type_id()))
            .map(|p| p.type_name())
            .collect();
        if !unsupported.is_empty() {
            return Err(SqlStreamsError::config(format!(
                "Unsupported parameters for constructor '{}' of {target}: {}",
                constructor.name(),
                unsupported.join(", ")
            )));
        }

        if let Selector::Indices(indices) = &selector {
            if indices.contains(&0) {
                return Err(SqlStreamsError::config(format!(
                    "column indices for {target} are 1-based, got {indices:?}"
                )));
            }
        }

        let mut slots = Vec::with_capacity(constructor.arity());
        for (i, param) in constructor.params().iter().enumerate() {
            let reader = match param.enum_reader() {
                Some(read) => Reader::Ordinal(read),
                None => Reader::Bound {
                    type_id: param.type_id(),
                    type_name: param.type_name(),
                },
            };
            let source = match &selector {
                Selector::Implicit => Source::Position(i + 1),
                Selector::Indices(indices) => Source::Index(indices[i]),
                Selector::Names(names) => Source::Name(names[i].clone()),
            };
            slots.push(Slot { reader, source });
        }

        tracing::debug!(
            target_type = target,
            constructor = constructor.name(),
            arity = slots.len(),
            "compiled row mapper"
        );
        Ok(Self {
            constructor,
            selector,
            slots,
        })
    }
}

impl<T: 'static> RowMapper<T> {
    /// Number of parameters, i.e. columns consumed by implicit mapping.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    #[must_use]
    pub fn constructor_name(&self) -> &'static str {
        self.constructor.name()
    }

    /// Build a `T` from the cursor's current row, reading cells through `registry`.
    ///
    /// # Errors
    /// `DriverError` if a cell cannot be read, `InstantiationError` if the factory fails.
    pub fn map_row(
        &self,
        registry: &TypeBindingRegistry,
        cursor: &mut dyn RowCursor,
    ) -> Result<T, SqlStreamsError> {
        let values = self.read_values(registry, cursor, 0)?;
        self.constructor.instantiate(values)
    }

    fn read_values(
        &self,
        registry: &TypeBindingRegistry,
        cursor: &mut dyn RowCursor,
        offset: usize,
    ) -> Result<Vec<Option<ErasedValue>>, SqlStreamsError> {
        self.slots
            .iter()
            .map(|slot| {
                let column = match &slot.source {
                    Source::Position(position) => Column::Index(offset + position),
                    Source::Index(index) => Column::Index(*index),
                    Source::Name(name) => Column::Name(name),
                };
                match &slot.reader {
                    Reader::Bound { type_id, type_name } => registry
                        .entry(*type_id)
                        .ok_or_else(|| {
                            SqlStreamsError::config(format!("No binding for {type_name}"))
                        })?
                        .read(cursor, column),
                    Reader::Ordinal(read) => read(cursor, column),
                }
            })
            .collect()
    }
}

/// Map one row into a pair: `left` reads the leading columns, `right` the ones after.
///
/// Both sides read their values before either factory runs.
///
/// # Errors
/// As [`RowMapper::map_row`], for either side.
pub fn combine<L: 'static, R: 'static>(
    left: &RowMapper<L>,
    right: &RowMapper<R>,
    registry: &TypeBindingRegistry,
    cursor: &mut dyn RowCursor,
) -> Result<(L, R), SqlStreamsError> {
    let left_values = left.read_values(registry, cursor, 0)?;
    let right_values = right.read_values(registry, cursor, left.arity())?;
    let l = left.constructor.instantiate(left_values)?;
    let r = right.constructor.instantiate(right_values)?;
    Ok((l, r))
}

fn select_constructor<T: 'static>(
    target: &str,
    constructors: Vec<Constructor<T>>,
    arity: Option<usize>,
) -> Result<Constructor<T>, SqlStreamsError> {
    match arity {
        Some(arity) => {
            let mut matching: Vec<_> = constructors
                .into_iter()
                .filter(|c| c.arity() == arity)
                .collect();
            match matching.len() {
                0 => Err(SqlStreamsError::config(format!(
                    "No constructor for '{target}' with exactly {arity} parameters"
                ))),
                1 => Ok(matching.remove(0)),
                _ => Err(SqlStreamsError::config(format!(
                    "Too many constructors for '{target}' with exactly {arity} parameters: {}",
                    names(&matching)
                ))),
            }
        }
        None => {
            let mut constructors = constructors;
            match constructors.len() {
                0 => {
                    return Err(SqlStreamsError::config(format!(
                        "No constructor for '{target}'"
                    )));
                }
                1 => return Ok(constructors.remove(0)),
                _ => {}
            }
            let mut marked: Vec<_> = constructors.into_iter().filter(|c| c.is_mapping()).collect();
            match marked.len() {
                0 => Err(SqlStreamsError::config(format!(
                    "Too many constructors found for '{target}'. Mark one with Constructor::mapping()"
                ))),
                1 => Ok(marked.remove(0)),
                _ => Err(SqlStreamsError::config(format!(
                    "Multiple constructors for '{target}' marked as mapping constructor: {}",
                    names(&marked)
                ))),
            }
        }
    }
}

fn names<T>(constructors: &[Constructor<T>]) -> String {
    constructors
        .iter()
        .map(|c| format!("{c:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}
