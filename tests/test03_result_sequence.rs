mod common;

use common::{EventLog, Script, ScriptedConnection, int, text};
use sql_streams::prelude::*;

fn three_rows() -> Script {
    Script::rows(
        &["id", "name"],
        vec![
            vec![int(1), text("ann")],
            vec![int(2), text("bob")],
            vec![int(3), text("cy")],
        ],
    )
}

fn supplied(log: &EventLog, script: Script) -> Sql {
    let log = log.clone();
    Sql::connect_with(move || {
        Ok(Box::new(ScriptedConnection::new(&log, script.clone())) as Box<dyn Connection>)
    })
}

fn release_events(log: &EventLog) -> Vec<String> {
    log.events()
        .into_iter()
        .filter(|e| e.ends_with(".close"))
        .collect()
}

#[test]
fn rows_are_pulled_on_demand() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let mut names = sql
        .query("SELECT id, name FROM users", &[])?
        .map(|row| row.require::<String>(2))?;
    assert_eq!(log.count("cursor.next"), 0);

    assert_eq!(names.next().transpose()?, Some("ann".to_string()));
    assert_eq!(log.count("cursor.next"), 1);
    assert_eq!(names.size_hint(), (0, None));

    assert_eq!(names.next().transpose()?, Some("bob".to_string()));
    assert_eq!(log.count("cursor.next"), 2);
    Ok(())
}

#[test]
fn exhaustion_releases_cursor_statement_connection_once() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let mut ids = sql
        .query("SELECT id, name FROM users", &[])?
        .map(|row| row.require::<i64>(1))?;
    let collected: Vec<i64> = ids.by_ref().collect::<Result<_, _>>()?;
    assert_eq!(collected, vec![1, 2, 3]);
    assert!(ids.is_closed());
    assert_eq!(ids.next().map(|r| r.is_ok()), None);
    drop(ids);

    assert_eq!(
        release_events(&log),
        vec!["cursor.close", "statement.close", "connection.close"]
    );
    Ok(())
}

#[test]
fn dropping_early_releases_everything() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let mut ids = sql
        .query("SELECT id FROM users", &[])?
        .map(|row| row.require::<i64>(1))?;
    assert_eq!(ids.next().transpose()?, Some(1));
    assert!(!ids.is_closed());
    drop(ids);

    assert_eq!(log.count("cursor.next"), 1);
    assert_eq!(
        release_events(&log),
        vec!["cursor.close", "statement.close", "connection.close"]
    );
    Ok(())
}

#[test]
fn explicit_close_releases_without_reading() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let ids = sql
        .query("SELECT id FROM users", &[])?
        .map(|row| row.require::<i64>(1))?;
    ids.close()?;

    assert_eq!(log.count("cursor.next"), 0);
    assert_eq!(log.count("cursor.close"), 1);
    assert_eq!(log.count("statement.close"), 1);
    assert_eq!(log.count("connection.close"), 1);
    Ok(())
}

#[test]
fn a_failing_row_does_not_end_the_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let results: Vec<Result<i64, SqlStreamsError>> = sql
        .query("SELECT id FROM users", &[])?
        .map(|row| {
            let id = row.require::<i64>(1)?;
            if id == 2 {
                return Err(SqlStreamsError::DriverError("bad row".into()));
            }
            Ok(id)
        })?
        .collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().ok(), Some(&3));
    assert_eq!(log.count("connection.close"), 1);
    Ok(())
}

#[test]
fn cursor_failure_is_reported_once_and_ends_the_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let script = Script {
        fail_advance_after: Some(1),
        ..three_rows()
    };
    let sql = supplied(&log, script);

    let mut ids = sql
        .query("SELECT id FROM users", &[])?
        .map(|row| row.require::<i64>(1))?;
    assert_eq!(ids.next().transpose()?, Some(1));

    let err = ids.next().unwrap().unwrap_err();
    assert!(matches!(err, SqlStreamsError::DriverError(_)));
    assert!(err.to_string().contains("connection reset"));
    assert!(ids.next().is_none());
    assert!(ids.is_closed());
    assert_eq!(log.count("cursor.close"), 1);
    assert_eq!(log.count("connection.close"), 1);
    Ok(())
}

#[test]
fn first_reads_one_row_and_releases() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let first = sql
        .query("SELECT name FROM users", &[])?
        .first(|row| row.get_by_name::<String>("name"))?;
    assert_eq!(first, Some(Some("ann".to_string())));
    assert_eq!(log.count("cursor.next"), 1);
    assert_eq!(log.count("connection.close"), 1);
    Ok(())
}

#[test]
fn empty_results_release_on_first_pull() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, Script::rows(&["id"], vec![]));

    let mut ids = sql
        .query("SELECT id FROM users WHERE 0", &[])?
        .map(|row| row.require::<i64>(1))?;
    assert!(ids.next().is_none());
    assert_eq!(
        release_events(&log),
        vec!["cursor.close", "statement.close", "connection.close"]
    );
    Ok(())
}

#[test]
fn parameters_are_bound_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let ids = sql
        .query("SELECT id FROM users WHERE id > ? AND name <> ?", &[&1_i64, &"bob".to_string()])?
        .map(|row| row.require::<i64>(1))?;
    drop(ids);

    assert_eq!(log.count("statement.bind 1 Int(1)"), 1);
    assert_eq!(log.count("statement.bind 2 Text(\"bob\")"), 1);
    let bind = log.position("statement.bind 1 Int(1)").unwrap();
    let run = log.position("statement.execute_query").unwrap();
    assert!(bind < run);
    Ok(())
}

#[test]
fn sequences_inside_a_transaction_leave_its_connection_open() -> Result<(), Box<dyn std::error::Error>> {
    let log = EventLog::default();
    let sql = supplied(&log, three_rows());

    let tx = sql.transaction()?;
    let ids: Vec<i64> = tx
        .query("SELECT id FROM users", &[])?
        .map(|row| row.require::<i64>(1))?
        .collect::<Result<_, _>>()?;
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(release_events(&log), vec!["cursor.close", "statement.close"]);
    assert_eq!(log.count("connection.close"), 0);
    assert!(!tx.is_closed());

    tx.close()?;
    assert_eq!(
        release_events(&log),
        vec!["cursor.close", "statement.close", "connection.close"]
    );
    Ok(())
}
