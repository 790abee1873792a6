//! Integration tests against a live MariaDB or MySQL server.
//!
//! Enabled with `--features mariadb-tests`. The server location comes from
//! `MARIADB_HOST`, `MARIADB_PORT`, `MARIADB_USER`, `MARIADB_PASSWORD`, and
//! `MARIADB_DATABASE` (defaults: localhost:3306, root with no password,
//! database test).

#![cfg(feature = "mariadb-tests")]

use std::env;
use std::error::Error;

use sql_dbal::{ColumnType, ConnectConfig, Connection, DriverKind, ExecAction, Fetched};

type TestError = Box<dyn Error>;

fn var(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn connect() -> Result<Connection, TestError> {
    let mut config = ConnectConfig::new(var("MARIADB_HOST", "localhost"))
        .port(var("MARIADB_PORT", "3306").parse()?)
        .username(var("MARIADB_USER", "root"))
        .database(var("MARIADB_DATABASE", "test"))
        .option("CONNECT_TIMEOUT", "10");
    if let Ok(password) = env::var("MARIADB_PASSWORD") {
        config = config.password(password);
    }
    Ok(Connection::open(DriverKind::Mariadb, &config)?)
}

#[test]
fn prepared_round_trip_and_auto_increment_id() -> Result<(), TestError> {
    let mut conn = connect()?;
    conn.execute_batch("DROP TABLE IF EXISTS dbal_my_roundtrip")?;
    conn.execute_batch(
        "CREATE TABLE dbal_my_roundtrip (
             id BIGINT AUTO_INCREMENT PRIMARY KEY,
             a BIGINT,
             b VARCHAR(64)
         )",
    )?;

    let mut insert = conn.prepare("INSERT INTO dbal_my_roundtrip (a, b) VALUES (?, ?)")?;
    assert_eq!(insert.param_count(), 2);
    insert.bind_int64(0, 10)?;
    insert.bind_text(1, "hello")?;
    insert.execute()?;
    insert.close()?;

    assert_eq!(conn.last_insert_id(None)?, 1);

    let mut select = conn.prepare("SELECT a, b, NULL FROM dbal_my_roundtrip WHERE a = ?")?;
    select.bind_int64(0, 10)?;
    select.execute()?;
    assert_eq!(select.fetch()?, Fetched::Row);
    assert_eq!(select.column_int64(0)?, Some(10));
    assert_eq!(select.column_text(1)?.as_deref(), Some("hello"));
    // This driver only distinguishes null from non-null column types.
    assert_eq!(select.column_type(0)?, ColumnType::Blob);
    assert_eq!(select.column_type(2)?, ColumnType::Null);
    assert_eq!(select.fetch()?, Fetched::Done);
    select.close()?;

    conn.execute_batch("DROP TABLE dbal_my_roundtrip")?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn exec_delivers_textual_rows() -> Result<(), TestError> {
    let mut conn = connect()?;
    let mut rows = Vec::new();
    conn.exec("SELECT 1 UNION ALL SELECT 2", |cols| {
        rows.push(cols.to_vec());
        ExecAction::Continue
    })?;
    assert_eq!(
        rows,
        vec![vec![Some("1".to_string())], vec![Some("2".to_string())]]
    );
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn transactions_roll_back_on_request() -> Result<(), TestError> {
    let mut conn = connect()?;
    conn.execute_batch("DROP TABLE IF EXISTS dbal_my_txn")?;
    conn.execute_batch("CREATE TABLE dbal_my_txn (a BIGINT)")?;

    conn.begin_transaction()?;
    conn.execute_batch("INSERT INTO dbal_my_txn (a) VALUES (1)")?;
    conn.rollback()?;

    let mut count = None;
    conn.exec("SELECT count(*) FROM dbal_my_txn", |cols| {
        count = cols[0].clone();
        ExecAction::Continue
    })?;
    assert_eq!(count.as_deref(), Some("0"));

    conn.execute_batch("DROP TABLE dbal_my_txn")?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}
