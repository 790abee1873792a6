#![cfg(feature = "sqlite")]

use std::error::Error;

use sql_dbal::{ColumnType, ConnectConfig, Connection, DriverKind, Fetched, Status};

type TestError = Box<dyn Error>;

fn open_temp_db(dir: &tempfile::TempDir) -> Result<Connection, TestError> {
    let path = dir.path().join("test.db");
    let config = ConnectConfig::new(path.to_string_lossy());
    Ok(Connection::open(DriverKind::Sqlite, &config)?)
}

#[test]
fn insert_and_select_round_trip() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (a INTEGER, b TEXT)")?;

    let mut insert = conn.prepare("INSERT INTO t (a, b) VALUES (?, ?)")?;
    assert_eq!(insert.param_count(), 2);
    assert_eq!(insert.column_count(), 0);
    insert.bind_int64(0, 10)?;
    insert.bind_text(1, "hello")?;
    insert.execute()?;
    insert.close()?;

    let mut select = conn.prepare("SELECT a, b FROM t WHERE a = ?")?;
    assert_eq!(select.param_count(), 1);
    assert_eq!(select.column_count(), 2);
    select.bind_int64(0, 10)?;
    select.execute()?;

    assert_eq!(select.fetch()?, Fetched::Row);
    assert_eq!(select.column_int64(0)?, Some(10));
    let text = select.column_text(1)?.ok_or("expected text")?;
    assert_eq!(text, "hello");
    assert_eq!(text.len(), 5);
    assert_eq!(select.column_type(0)?, ColumnType::Int);
    assert_eq!(select.column_type(1)?, ColumnType::Text);
    assert_eq!(select.fetch()?, Fetched::Done);

    select.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn rebinding_replaces_the_previous_value() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (a INTEGER)")?;

    let mut insert = conn.prepare("INSERT INTO t (a) VALUES (?)")?;
    insert.bind_int64(0, 1)?;
    insert.bind_int64(0, 2)?;
    insert.execute()?;
    // Parameters persist across executions until rebound.
    insert.execute()?;
    insert.bind_int64(0, 3)?;
    insert.execute()?;
    insert.close()?;

    let mut select = conn.prepare("SELECT a FROM t ORDER BY a")?;
    select.execute()?;
    let mut values = Vec::new();
    while select.fetch()? == Fetched::Row {
        values.push(select.column_int64(0)?);
    }
    assert_eq!(values, vec![Some(2), Some(2), Some(3)]);

    select.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn unbound_parameters_execute_as_null() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (a INTEGER, b TEXT)")?;

    let mut insert = conn.prepare("INSERT INTO t (a, b) VALUES (?, ?)")?;
    insert.execute()?;
    insert.close()?;

    let mut select = conn.prepare("SELECT a, b FROM t")?;
    select.execute()?;
    assert_eq!(select.fetch()?, Fetched::Row);
    assert_eq!(select.column_int64(0)?, None);
    assert_eq!(select.column_text(1)?, None);
    assert_eq!(select.column_type(0)?, ColumnType::Null);

    select.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn explicit_null_bind_round_trips() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (a INTEGER)")?;

    let mut insert = conn.prepare("INSERT INTO t (a) VALUES (?)")?;
    insert.bind_int64(0, 7)?;
    insert.bind_null(0)?;
    insert.execute()?;
    insert.close()?;

    let mut select = conn.prepare("SELECT a FROM t")?;
    select.execute()?;
    assert_eq!(select.fetch()?, Fetched::Row);
    assert_eq!(select.column_int64(0)?, None);
    assert_eq!(select.column_blob(0)?, None);
    assert_eq!(select.column_text(0)?, None);

    select.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn blob_bind_and_read_preserve_bytes() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (data BLOB)")?;

    let payload = vec![0u8, 1, 2, 254, 255];
    let mut insert = conn.prepare("INSERT INTO t (data) VALUES (?)")?;
    insert.bind_blob(0, payload.clone())?;
    insert.execute()?;
    insert.close()?;

    let mut select = conn.prepare("SELECT data FROM t")?;
    select.execute()?;
    assert_eq!(select.fetch()?, Fetched::Row);
    assert_eq!(select.column_blob(0)?, Some(payload));
    assert_eq!(select.column_type(0)?, ColumnType::Blob);

    select.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn out_of_range_indexes_never_reach_the_driver() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (a INTEGER)")?;

    let mut stmt = conn.prepare("SELECT a FROM t WHERE a = ?")?;
    let err = stmt.bind_int64(1, 5).unwrap_err();
    assert_eq!(err.status(), Status::Param);
    assert_eq!(conn.last_status(), Status::Param);

    conn.clear_status();
    stmt.bind_int64(0, 5)?;
    stmt.execute()?;
    let err = stmt.column_text(9).unwrap_err();
    assert_eq!(err.status(), Status::Param);

    stmt.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn reading_without_a_current_row_is_a_fetch_error() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (a INTEGER)")?;

    let mut stmt = conn.prepare("SELECT a FROM t")?;
    stmt.execute()?;
    // No fetch yet.
    let err = stmt.column_int64(0).unwrap_err();
    assert_eq!(err.status(), Status::Fetch);

    assert_eq!(stmt.fetch()?, Fetched::Done);
    let err = stmt.column_int64(0).unwrap_err();
    assert_eq!(err.status(), Status::Fetch);

    stmt.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn text_columns_coerce_to_integers_only_when_well_formed() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch(
        "CREATE TABLE t (id INTEGER, v TEXT);
         INSERT INTO t (id, v) VALUES (1, '42'), (2, '12abc');",
    )?;

    let mut stmt = conn.prepare("SELECT v FROM t ORDER BY id")?;
    stmt.execute()?;

    assert_eq!(stmt.fetch()?, Fetched::Row);
    assert_eq!(stmt.column_int64(0)?, Some(42));

    assert_eq!(stmt.fetch()?, Fetched::Row);
    let err = stmt.column_int64(0).unwrap_err();
    assert_eq!(err.status(), Status::ColumnCoerce);
    // The raw value is still readable as text.
    assert_eq!(stmt.column_text(0)?.as_deref(), Some("12abc"));

    stmt.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn float_columns_report_other_and_truncate_to_int() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (v REAL); INSERT INTO t (v) VALUES (2.5);")?;

    let mut stmt = conn.prepare("SELECT v FROM t")?;
    stmt.execute()?;
    assert_eq!(stmt.fetch()?, Fetched::Row);
    assert_eq!(stmt.column_type(0)?, ColumnType::Other);
    assert_eq!(stmt.column_int64(0)?, Some(2));
    assert_eq!(stmt.column_text(0)?.as_deref(), Some("2.5"));

    stmt.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

#[test]
fn re_executing_a_select_resets_the_cursor() -> Result<(), TestError> {
    let dir = tempfile::tempdir()?;
    let mut conn = open_temp_db(&dir)?;
    conn.execute_batch("CREATE TABLE t (a INTEGER); INSERT INTO t (a) VALUES (1), (2);")?;

    let mut stmt = conn.prepare("SELECT a FROM t ORDER BY a")?;
    stmt.execute()?;
    assert_eq!(stmt.fetch()?, Fetched::Row);
    assert_eq!(stmt.column_int64(0)?, Some(1));

    stmt.execute()?;
    let mut values = Vec::new();
    while stmt.fetch()? == Fetched::Row {
        values.push(stmt.column_int64(0)?);
    }
    assert_eq!(values, vec![Some(1), Some(2)]);

    stmt.close()?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}
