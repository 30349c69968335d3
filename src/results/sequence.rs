use std::iter::FusedIterator;
use std::sync::Arc;

use crate::bindings::TypeBindingRegistry;
use crate::driver::RowCursor;
use crate::error::SqlStreamsError;
use crate::executor::StatementHolder;

use super::row::RowView;

type Mapping<T> = Box<dyn FnMut(&mut RowView<'_>) -> Result<T, SqlStreamsError> + Send>;

/// Lazy, single-pass sequence of mapped rows.
///
/// Each call to `next` advances the cursor once and maps the row. When the cursor
/// is exhausted, the sequence is closed or dropped, the cursor, statement and (for
/// one-shot queries) connection are released in that order, exactly once.
///
/// A failure to read or map a row is yielded for that row and iteration may go on.
/// A failure to advance the cursor is yielded once and ends the sequence.
pub struct ResultSequence<T> {
    cursor: Option<Box<dyn RowCursor>>,
    holder: StatementHolder,
    registry: Arc<TypeBindingRegistry>,
    mapping: Mapping<T>,
    done: bool,
}

impl<T> std::fmt::Debug for ResultSequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSequence")
            .field("done", &self.done)
            .field("holder", &self.holder)
            .finish_non_exhaustive()
    }
}

impl<T> ResultSequence<T> {
    pub(crate) fn new<F>(
        cursor: Box<dyn RowCursor>,
        holder: StatementHolder,
        registry: Arc<TypeBindingRegistry>,
        mapping: F,
    ) -> Self
    where
        F: FnMut(&mut RowView<'_>) -> Result<T, SqlStreamsError> + Send + 'static,
    {
        Self {
            cursor: Some(cursor),
            holder,
            registry,
            mapping: Box::new(mapping),
            done: false,
        }
    }

    /// Whether the underlying resources have been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none() && self.holder.is_released()
    }

    /// Release the cursor and statement without reading further rows.
    ///
    /// # Errors
    /// The first failure reported while closing; every resource is still attempted.
    pub fn close(mut self) -> Result<(), SqlStreamsError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), SqlStreamsError> {
        self.done = true;
        let mut first: Option<SqlStreamsError> = None;
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close() {
                first.get_or_insert(e.into());
            }
        }
        if let Err(e) = self.holder.release() {
            first.get_or_insert(e);
        }
        first.map_or(Ok(()), Err)
    }
}

impl<T> Iterator for ResultSequence<T> {
    type Item = Result<T, SqlStreamsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(cursor) = self.cursor.as_mut() else {
            self.done = true;
            return None;
        };
        match cursor.next_row() {
            Ok(true) => {
                let mut row = RowView::new(&mut **cursor, &self.registry);
                Some((self.mapping)(&mut row))
            }
            Ok(false) => {
                tracing::debug!("result sequence exhausted");
                self.release().err().map(Err)
            }
            Err(e) => {
                if let Err(close_err) = self.release() {
                    tracing::warn!(error = %close_err, "failed to release after cursor error");
                }
                Some(Err(e.into()))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done { (0, Some(0)) } else { (0, None) }
    }
}

impl<T> FusedIterator for ResultSequence<T> {}

impl<T> Drop for ResultSequence<T> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release result sequence");
        }
    }
}
