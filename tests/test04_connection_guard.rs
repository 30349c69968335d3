mod common;

use common::{EventLog, Script, ScriptedConnection, int};
use sql_streams::prelude::*;
use sql_streams::{ConnectionSource, SingleConnectionSource};

fn guarded(log: &EventLog, script: Script) -> SingleConnectionSource {
    SingleConnectionSource::new(Box::new(ScriptedConnection::new(log, script)))
}

#[test]
fn second_checkout_fails_immediately() -> Result<(), BoxError> {
    let log = EventLog::default();
    let source = guarded(&log, Script::default());

    let mut lease = source.checkout()?;
    assert!(source.in_use());
    assert!(!lease.is_closed());

    let err = source.checkout().unwrap_err();
    assert!(err.is_state_error());
    assert_eq!(err.to_string(), "Illegal state: Connection already in use");

    lease.close()?;
    assert!(!source.in_use());
    assert!(lease.is_closed());
    let _again = source.checkout()?;
    Ok(())
}

#[test]
fn closing_a_lease_rolls_back_and_restores_auto_commit() -> Result<(), BoxError> {
    let log = EventLog::default();
    let source = guarded(&log, Script::default());

    let mut lease = source.checkout()?;
    lease.set_auto_commit(false)?;
    log.clear();

    lease.close()?;
    assert_eq!(
        log.events(),
        vec!["connection.rollback", "connection.auto_commit true"]
    );

    // Closing again is a no-op.
    lease.close()?;
    assert_eq!(log.count("connection.rollback"), 1);
    assert_eq!(log.count("connection.close"), 0);
    Ok(())
}

#[test]
fn lease_in_auto_commit_mode_skips_rollback() -> Result<(), BoxError> {
    let log = EventLog::default();
    let source = guarded(&log, Script::default());

    let mut lease = source.checkout()?;
    lease.close()?;
    assert_eq!(log.count("connection.rollback"), 0);
    assert_eq!(log.count("connection.close"), 0);
    Ok(())
}

#[test]
fn failed_rollback_still_returns_the_connection() {
    let log = EventLog::default();
    let script = Script {
        fail_rollback: true,
        ..Script::default()
    };
    let source = guarded(&log, script);

    let mut lease = source.checkout().unwrap();
    lease.set_auto_commit(false).unwrap();
    let err = SqlStreamsError::from(lease.close().unwrap_err());
    assert!(matches!(err, SqlStreamsError::DriverError(_)));
    assert!(err.to_string().contains("rollback refused"));
    assert_eq!(log.count("connection.auto_commit true"), 1);
    assert!(!source.in_use());
}

#[test]
fn dropping_a_lease_returns_it() {
    let log = EventLog::default();
    let source = guarded(&log, Script::default());
    {
        let mut lease = source.checkout().unwrap();
        lease.set_auto_commit(false).unwrap();
    }
    assert!(!source.in_use());
    assert_eq!(log.count("connection.rollback"), 1);
    assert!(source.checkout().is_ok());
}

#[test]
fn closing_the_source_closes_the_physical_connection() -> Result<(), BoxError> {
    let log = EventLog::default();
    let source = guarded(&log, Script::default());
    source.close()?;
    source.close()?;
    assert_eq!(log.count("connection.close"), 1);
    Ok(())
}

#[test]
fn an_open_sequence_holds_the_single_connection() -> Result<(), BoxError> {
    let log = EventLog::default();
    let sql = Sql::connect_single(ScriptedConnection::new(
        &log,
        Script::rows(&["n"], vec![vec![int(1)], vec![int(2)]]),
    ));

    let mut first = sql
        .query("SELECT n FROM t", &[])?
        .map(|row| row.require::<i64>(1))?;
    assert_eq!(first.next().transpose()?, Some(1));

    let err = sql.query("SELECT n FROM t", &[]).unwrap_err();
    assert!(err.is_state_error());

    assert_eq!(first.next().transpose()?, Some(2));
    assert!(first.next().is_none());

    let total: i64 = sql
        .query("SELECT n FROM t", &[])?
        .map(|row| row.require::<i64>(1))?
        .sum::<Result<i64, _>>()?;
    assert_eq!(total, 3);
    assert_eq!(log.count("connection.close"), 0);
    Ok(())
}

#[test]
fn prepare_failures_release_the_lease() {
    let log = EventLog::default();
    let script = Script {
        fail_prepare: true,
        ..Script::default()
    };
    let sql = Sql::connect_single(ScriptedConnection::new(&log, script));

    for _ in 0..2 {
        let err = sql.query("SELEC 1", &[]).unwrap_err();
        assert!(matches!(err, SqlStreamsError::DriverError(_)));
        assert!(err.to_string().contains("syntax error"));
    }
    assert_eq!(log.count("connection.prepare SELEC 1"), 2);
}
