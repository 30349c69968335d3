#![cfg(feature = "sqlite")]

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use sql_streams::prelude::*;
use sql_streams::sqlite::SqliteOptions;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Draft,
    Published,
    Archived,
}

sql_enum!(Status { Draft, Published, Archived });

#[derive(Debug, PartialEq)]
struct Article {
    id: i64,
    title: String,
    status: Status,
    published_at: Option<NaiveDateTime>,
    pinned: bool,
}

impl FromRow for Article {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![
            Constructor::new("Article", |args| {
                Ok(Article {
                    id: args.take()?,
                    title: args.take()?,
                    status: args.take()?,
                    published_at: args.take_opt()?,
                    pinned: args.take()?,
                })
            })
            .param::<i64>()
            .param::<String>()
            .enum_param::<Status>()
            .param::<NaiveDateTime>()
            .param::<bool>(),
        ]
    }
}

#[derive(Debug, PartialEq)]
struct Key(i64);

impl FromRow for Key {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new("Key", |args| Ok(Key(args.take()?))).param::<i64>()]
    }
}

fn articles() -> Result<Sql, Box<dyn std::error::Error>> {
    let sql = Sql::connect_single(SqliteConnection::open_in_memory()?);
    sql.exec(
        "CREATE TABLE articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            status INTEGER NOT NULL,
            published_at TEXT,
            pinned INTEGER NOT NULL DEFAULT 0
        )",
    )?;
    Ok(sql)
}

#[test]
fn enums_nulls_and_timestamps_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let sql = articles()?;
    let published = NaiveDate::from_ymd_opt(2024, 5, 17)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();

    sql.count(
        "INSERT INTO articles (title, status, published_at, pinned) VALUES (?, ?, ?, ?)",
        &[&"hello".to_string(), &Status::Published, &published, &true],
    )?;
    sql.count(
        "INSERT INTO articles (title, status, published_at, pinned) VALUES (?, ?, ?, ?)",
        &[&"wip".to_string(), &Status::Draft, &SqlValue::Null, &false],
    )?;

    let all: Vec<Article> = sql
        .query("SELECT id, title, status, published_at, pinned FROM articles ORDER BY id", &[])?
        .map_to::<Article>()?
        .collect::<Result<_, _>>()?;
    assert_eq!(
        all,
        vec![
            Article {
                id: 1,
                title: "hello".to_string(),
                status: Status::Published,
                published_at: Some(published),
                pinned: true,
            },
            Article {
                id: 2,
                title: "wip".to_string(),
                status: Status::Draft,
                published_at: None,
                pinned: false,
            },
        ]
    );

    let stored: Option<i64> = sql
        .query("SELECT status FROM articles WHERE title = ?", &[&"hello".to_string()])?
        .first(|row| row.require::<i64>(1))?;
    assert_eq!(stored, Some(1));
    Ok(())
}

#[test]
fn enum_columns_can_be_read_from_a_row_view() -> Result<(), Box<dyn std::error::Error>> {
    let sql = articles()?;
    sql.count(
        "INSERT INTO articles (title, status) VALUES (?, ?)",
        &[&"old".to_string(), &Status::Archived],
    )?;

    let status = sql
        .query("SELECT status FROM articles", &[])?
        .first(|row| row.get_enum_by_name::<Status>("status"))?;
    assert_eq!(status, Some(Some(Status::Archived)));

    sql.count("UPDATE articles SET status = 7", &[])?;
    let err = sql
        .query("SELECT status FROM articles", &[])?
        .first(|row| row.get_enum::<Status>(1))
        .unwrap_err();
    assert!(err.to_string().contains("out of range"));
    Ok(())
}

#[test]
fn generated_keys_come_back_from_inserts() -> Result<(), Box<dyn std::error::Error>> {
    let sql = articles()?;
    sql.count(
        "INSERT INTO articles (title, status) VALUES (?, ?)",
        &[&"one".to_string(), &Status::Draft],
    )?;

    let keys: Vec<Key> = sql
        .update_returning(
            "INSERT INTO articles (title, status) VALUES (?, ?)",
            &[&"two".to_string(), &Status::Draft],
        )?
        .generated_to::<Key>()?
        .collect::<Result<_, _>>()?;
    assert_eq!(keys, vec![Key(2)]);

    let untouched = sql
        .update_returning("UPDATE articles SET title = 'x' WHERE id = ?", &[&42_i64])?
        .generated(|row| row.require::<i64>(1))?
        .count();
    assert_eq!(untouched, 0);
    Ok(())
}

#[test]
fn batches_report_one_count_per_entry() -> Result<(), Box<dyn std::error::Error>> {
    let sql = articles()?;

    let counts = sql
        .batch_update("INSERT INTO articles (title, status) VALUES (?, ?)")?
        .with(&[&"a".to_string(), &Status::Draft])?
        .end_batch()?
        .with(&[&"b".to_string(), &Status::Published])?
        .end_batch()?
        .set(1, &"c".to_string())?
        .end_batch()?
        .counts()?;
    assert_eq!(counts, vec![1, 1, 1]);

    let changed = sql
        .batch_update("UPDATE articles SET pinned = 1 WHERE status = ?")?
        .with(&[&Status::Published])?
        .end_batch()?
        .with(&[&Status::Archived])?
        .end_batch()?
        .count()?;
    // "b" and "c" are both published; nothing is archived.
    assert_eq!(changed, 2);
    Ok(())
}

#[test]
fn raw_statement_access_and_execute() -> Result<(), Box<dyn std::error::Error>> {
    let sql = articles()?;
    assert!(!sql.exec("CREATE TABLE tags (name TEXT, meta TEXT, data BLOB)")?);

    sql.update("INSERT INTO tags (name, meta, data) VALUES (?, ?, ?)", &[])?
        .prepare(|stmt| stmt.bind(1, SqlValue::Text("rust".into())))?
        .set(2, &json!({ "color": "orange" }))?
        .set(3, &vec![0xde_u8, 0xad])?
        .count()?;

    let (meta, data) = sql
        .query("SELECT meta, data FROM tags", &[])?
        .first(|row| {
            Ok((
                row.require::<serde_json::Value>(1)?,
                row.require::<Vec<u8>>(2)?,
            ))
        })?
        .ok_or("no row")?;
    assert_eq!(meta["color"], "orange");
    assert_eq!(data, vec![0xde, 0xad]);

    assert!(sql.execute("SELECT name FROM tags", &[])?.execute()?);
    Ok(())
}

#[test]
fn syntax_errors_surface_as_driver_errors_and_free_the_connection()
-> Result<(), Box<dyn std::error::Error>> {
    let sql = articles()?;
    let err = sql.query("SELEC nothing", &[]).unwrap_err();
    assert!(matches!(err, SqlStreamsError::DriverError(_)));

    let n: Option<i64> = sql
        .query("SELECT COUNT(*) FROM articles", &[])?
        .first(|row| row.require::<i64>(1))?;
    assert_eq!(n, Some(0));
    Ok(())
}

#[test]
fn options_load_from_json_and_open_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("opts.db");
    let json = format!(
        r#"{{ "db_path": {}, "wal": true, "busy_timeout_ms": 2000 }}"#,
        serde_json::to_string(&path.to_string_lossy())?
    );
    let opts = SqliteOptions::from_json(&json)?;
    assert!(opts.wal);
    assert!(opts.foreign_keys);

    let sql = Sql::connect(opts.source());
    sql.exec("CREATE TABLE t (n INTEGER)")?;
    sql.count("INSERT INTO t VALUES (?)", &[&1_i64])?;
    let mode: Option<String> = sql
        .query("PRAGMA journal_mode", &[])?
        .first(|row| row.require::<String>(1))?;
    assert_eq!(mode.as_deref(), Some("wal"));

    let err = SqliteOptions::from_json("{ not json").unwrap_err();
    assert!(err.is_config_error());
    Ok(())
}
