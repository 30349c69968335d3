use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bindings::TypeBindingRegistry;
use crate::error::SqlStreamsError;

use super::constructor::FromRow;
use super::mapper::{RowMapper, Selector};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MapperKey {
    target: TypeId,
    selector: Selector,
}

type Compiled = Arc<dyn Any + Send + Sync>;

/// Compiled mappers keyed by target type and column selector.
///
/// Compilation happens under the cache lock, so concurrent first uses of the same
/// key compile once and share the result. Failed compilations are not cached.
#[derive(Default)]
pub struct MapperCache {
    mappers: Mutex<HashMap<MapperKey, Compiled>>,
    compiled: AtomicUsize,
}

impl std::fmt::Debug for MapperCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperCache")
            .field("len", &self.len())
            .field("compiled", &self.compiled_count())
            .finish()
    }
}

impl MapperCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MapperKey, Compiled>> {
        match self.mappers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fetch the mapper for `(T, selector)`, compiling it on first use.
    ///
    /// # Errors
    /// Whatever [`RowMapper::compile`] reports.
    pub fn get_or_compile<T: FromRow>(
        &self,
        registry: &TypeBindingRegistry,
        selector: Selector,
    ) -> Result<Arc<RowMapper<T>>, SqlStreamsError> {
        let key = MapperKey {
            target: TypeId::of::<T>(),
            selector,
        };
        let mut mappers = self.lock();
        if let Some(existing) = mappers.get(&key) {
            return Arc::clone(existing).downcast::<RowMapper<T>>().map_err(|_| {
                SqlStreamsError::state(format!(
                    "cached mapper for {} has the wrong type",
                    std::any::type_name::<T>()
                ))
            });
        }

        let mapper = Arc::new(RowMapper::<T>::compile(registry, key.selector.clone())?);
        self.compiled.fetch_add(1, Ordering::Relaxed);
        mappers.insert(key, Arc::clone(&mapper) as Compiled);
        Ok(mapper)
    }

    /// How many compilations have succeeded so far.
    #[must_use]
    pub fn compiled_count(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every compiled mapper, e.g. after re-registering bindings.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
