#![allow(dead_code)]

//! A scripted in-process driver that records every call it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sql_streams::{BoxError, Connection, IsolationLevel, RowCursor, SqlValue, Statement};

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// What every statement prepared on a scripted connection returns.
#[derive(Clone, Default)]
pub struct Script {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
    pub update_count: u64,
    pub fail_advance_after: Option<usize>,
    pub fail_prepare: bool,
    pub fail_rollback: bool,
}

impl Script {
    pub fn rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
            ..Self::default()
        }
    }
}

pub struct ScriptedConnection {
    log: EventLog,
    script: Script,
    auto_commit: bool,
    closed: bool,
}

impl ScriptedConnection {
    pub fn new(log: &EventLog, script: Script) -> Self {
        Self {
            log: log.clone(),
            script,
            auto_commit: true,
            closed: false,
        }
    }
}

impl Connection for ScriptedConnection {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>, BoxError> {
        self.log.push(format!("connection.prepare {sql}"));
        if self.script.fail_prepare {
            return Err(format!("syntax error near '{sql}'").into());
        }
        Ok(Box::new(ScriptedStatement {
            log: self.log.clone(),
            script: self.script.clone(),
        }))
    }

    fn auto_commit(&self) -> Result<bool, BoxError> {
        Ok(self.auto_commit)
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), BoxError> {
        self.log.push(format!("connection.auto_commit {auto_commit}"));
        self.auto_commit = auto_commit;
        Ok(())
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), BoxError> {
        self.log.push(format!("connection.isolation {level:?}"));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.log.push("connection.commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        self.log.push("connection.rollback");
        if self.script.fail_rollback {
            return Err("rollback refused".into());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.log.push("connection.close");
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

pub struct ScriptedStatement {
    log: EventLog,
    script: Script,
}

impl Statement for ScriptedStatement {
    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), BoxError> {
        self.log.push(format!("statement.bind {index} {value:?}"));
        Ok(())
    }

    fn execute(&mut self) -> Result<bool, BoxError> {
        self.log.push("statement.execute");
        Ok(!self.script.columns.is_empty())
    }

    fn execute_update(&mut self) -> Result<u64, BoxError> {
        self.log.push("statement.execute_update");
        Ok(self.script.update_count)
    }

    fn execute_query(&mut self) -> Result<Box<dyn RowCursor>, BoxError> {
        self.log.push("statement.execute_query");
        Ok(Box::new(ScriptedCursor::new(&self.log, &self.script)))
    }

    fn add_batch(&mut self) -> Result<(), BoxError> {
        self.log.push("statement.add_batch");
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>, BoxError> {
        self.log.push("statement.execute_batch");
        Ok(vec![self.script.update_count])
    }

    fn generated_keys(&mut self) -> Result<Box<dyn RowCursor>, BoxError> {
        self.log.push("statement.generated_keys");
        Ok(Box::new(ScriptedCursor::new(&self.log, &self.script)))
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.log.push("statement.close");
        Ok(())
    }
}

pub struct ScriptedCursor {
    log: EventLog,
    columns: Vec<String>,
    rows: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
    was_null: bool,
    advanced: usize,
    fail_advance_after: Option<usize>,
}

impl ScriptedCursor {
    pub fn new(log: &EventLog, script: &Script) -> Self {
        Self {
            log: log.clone(),
            columns: script.columns.clone(),
            rows: script.rows.clone().into(),
            current: None,
            was_null: false,
            advanced: 0,
            fail_advance_after: script.fail_advance_after,
        }
    }

    /// A cursor already positioned on its only row.
    pub fn single_row(columns: &[&str], row: Vec<SqlValue>) -> Self {
        let log = EventLog::default();
        let mut cursor = Self::new(&log, &Script::rows(columns, vec![row]));
        cursor.next_row().unwrap();
        cursor
    }
}

impl RowCursor for ScriptedCursor {
    fn next_row(&mut self) -> Result<bool, BoxError> {
        self.log.push("cursor.next");
        if self.fail_advance_after == Some(self.advanced) {
            return Err("connection reset by peer".into());
        }
        self.advanced += 1;
        self.current = self.rows.pop_front();
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
        let value = row
            .get(index.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| format!("column {index} out of range"))?;
        self.was_null = value.is_null();
        Ok(value)
    }

    fn was_null(&self) -> bool {
        self.was_null
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.log.push("cursor.close");
        Ok(())
    }
}

pub fn int(i: i64) -> SqlValue {
    SqlValue::Int(i)
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}
