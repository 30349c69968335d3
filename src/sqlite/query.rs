use std::collections::VecDeque;

use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::driver::{RowCursor, Statement};
use crate::error::BoxError;
use crate::types::SqlValue;

use super::connection::{SharedConnection, with_sqlite};
use super::params::{extract_value, sql_value_to_sqlite};

fn affected(rows: usize) -> u64 {
    u64::try_from(rows).unwrap_or(u64::MAX)
}

/// Statement text plus its bound parameters.
///
/// rusqlite statements borrow their connection, so the compiled statement is
/// fetched from the connection's statement cache on every execution instead of
/// being held here.
pub struct SqliteStatement {
    shared: SharedConnection,
    sql: String,
    params: Vec<Value>,
    batch: Vec<Vec<Value>>,
    last_insert_rowid: Option<i64>,
    closed: bool,
}

impl std::fmt::Debug for SqliteStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStatement")
            .field("sql", &self.sql)
            .field("params", &self.params.len())
            .field("batch", &self.batch.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl SqliteStatement {
    pub(crate) fn new(shared: SharedConnection, sql: &str) -> Self {
        Self {
            shared,
            sql: sql.to_string(),
            params: Vec::new(),
            batch: Vec::new(),
            last_insert_rowid: None,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), BoxError> {
        if self.closed {
            Err("statement is closed".into())
        } else {
            Ok(())
        }
    }
}

impl Statement for SqliteStatement {
    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), BoxError> {
        self.ensure_open()?;
        if index == 0 {
            return Err("parameter indices start at 1".into());
        }
        if self.params.len() < index {
            self.params.resize(index, Value::Null);
        }
        self.params[index - 1] = sql_value_to_sqlite(value);
        Ok(())
    }

    fn execute(&mut self) -> Result<bool, BoxError> {
        self.ensure_open()?;
        with_sqlite(&self.shared, |c| {
            let mut stmt = c.prepare_cached(&self.sql)?;
            if stmt.column_count() > 0 {
                let mut rows = stmt.query(params_from_iter(self.params.iter()))?;
                while rows.next()?.is_some() {}
                Ok(true)
            } else {
                stmt.execute(params_from_iter(self.params.iter()))?;
                Ok(false)
            }
        })
    }

    fn execute_update(&mut self) -> Result<u64, BoxError> {
        self.ensure_open()?;
        let (count, rowid) = with_sqlite(&self.shared, |c| {
            let mut stmt = c.prepare_cached(&self.sql)?;
            let count = stmt.execute(params_from_iter(self.params.iter()))?;
            Ok((count, c.last_insert_rowid()))
        })?;
        self.last_insert_rowid = (count > 0).then_some(rowid);
        Ok(affected(count))
    }

    fn execute_query(&mut self) -> Result<Box<dyn RowCursor>, BoxError> {
        self.ensure_open()?;
        let (columns, rows) = with_sqlite(&self.shared, |c| {
            let mut stmt = c.prepare_cached(&self.sql)?;
            let columns: Vec<String> = stmt
                .column_names()
                .iter()
                .map(std::string::ToString::to_string)
                .collect();
            let width = columns.len();
            let mut rows_iter = stmt.query(params_from_iter(self.params.iter()))?;
            let mut rows = VecDeque::new();
            while let Some(row) = rows_iter.next()? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(extract_value(row, i)?);
                }
                rows.push_back(values);
            }
            Ok((columns, rows))
        })?;
        tracing::debug!(rows = rows.len(), "sqlite query buffered");
        Ok(Box::new(SqliteCursor::new(columns, rows)))
    }

    fn add_batch(&mut self) -> Result<(), BoxError> {
        self.ensure_open()?;
        self.batch.push(self.params.clone());
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>, BoxError> {
        self.ensure_open()?;
        let batch = std::mem::take(&mut self.batch);
        let (counts, rowid) = with_sqlite(&self.shared, |c| {
            let mut stmt = c.prepare_cached(&self.sql)?;
            let mut counts = Vec::with_capacity(batch.len());
            for params in &batch {
                counts.push(affected(stmt.execute(params_from_iter(params.iter()))?));
            }
            Ok((counts, c.last_insert_rowid()))
        })?;
        self.last_insert_rowid = counts.iter().any(|n| *n > 0).then_some(rowid);
        Ok(counts)
    }

    fn generated_keys(&mut self) -> Result<Box<dyn RowCursor>, BoxError> {
        self.ensure_open()?;
        let rows = self
            .last_insert_rowid
            .map(|id| vec![SqlValue::Int(id)])
            .into_iter()
            .collect();
        Ok(Box::new(SqliteCursor::new(
            vec!["last_insert_rowid()".to_string()],
            rows,
        )))
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed = true;
        self.params.clear();
        self.batch.clear();
        Ok(())
    }
}

/// Cursor over rows buffered when the query ran.
///
/// The whole result set is read into memory by `execute_query`, before the first
/// `next_row`. Mapping stays lazy, but memory use grows with the result size.
#[derive(Debug)]
pub struct SqliteCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
    was_null: bool,
    closed: bool,
}

impl SqliteCursor {
    pub(crate) fn new(columns: Vec<String>, rows: VecDeque<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            current: None,
            was_null: false,
            closed: false,
        }
    }
}

impl RowCursor for SqliteCursor {
    fn next_row(&mut self) -> Result<bool, BoxError> {
        if self.closed {
            return Err("cursor is closed".into());
        }
        self.current = self.rows.pop_front();
        self.was_null = false;
        Ok(self.current.is_some())
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_index(&self, name: &str) -> Result<usize, BoxError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .map(|i| i + 1)
            .ok_or_else(|| format!("no column named '{name}'").into())
    }

    fn value(&mut self, index: usize) -> Result<SqlValue, BoxError> {
        let row = self.current.as_ref().ok_or("no current row")?;
        let value = index
            .checked_sub(1)
            .and_then(|i| row.get(i))
            .cloned()
            .ok_or_else(|| format!("column index {index} out of range 1..={}", row.len()))?;
        self.was_null = value.is_null();
        Ok(value)
    }

    fn was_null(&self) -> bool {
        self.was_null
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed = true;
        self.rows.clear();
        self.current = None;
        Ok(())
    }
}
