//! SQLite adapter over `rusqlite`.
//!
//! Statements are compiled through the connection's prepared-statement
//! cache; each execution binds the parameter arena, steps the query to
//! completion under the busy-retry policy, and materializes the rows into
//! the shared result arena.

use std::cell::RefCell;
use std::rc::Rc;

use rusqlite::types::ValueRef;
use rusqlite::{Batch, ErrorCode, OpenFlags};

use crate::adapters::rows::RowBuffer;
use crate::adapters::{
    DriverConnection, DriverStatement, ExecRowCallback, NativeConnection, NativeStatement,
};
use crate::config::{ConnectConfig, Flags};
use crate::connection::ExecAction;
use crate::error::DbalError;
use crate::numeric;
use crate::retry;
use crate::statement::Fetched;
use crate::value::{ColumnType, Value};

pub(crate) struct SqliteDriver {
    conn: Rc<RefCell<rusqlite::Connection>>,
}

pub(crate) fn open(config: &ConnectConfig) -> Result<Box<dyn DriverConnection>, DbalError> {
    let mut vfs = None;
    for option in &config.options {
        match option.key.as_str() {
            "VFS" => vfs = Some(option.value.as_str()),
            other => {
                return Err(DbalError::Param(format!(
                    "unrecognized SQLite option {other:?}"
                )));
            }
        }
    }

    let mut flags = OpenFlags::empty();
    if config.flags.contains(Flags::SQLITE_OPEN_READONLY) {
        flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
    }
    if config.flags.contains(Flags::SQLITE_OPEN_READWRITE) {
        flags |= OpenFlags::SQLITE_OPEN_READ_WRITE;
    }
    if config.flags.contains(Flags::SQLITE_OPEN_CREATE) {
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
    }
    if flags.is_empty() {
        flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    }
    flags |= OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = match vfs {
        Some(vfs) => rusqlite::Connection::open_with_flags_and_vfs(&config.location, flags, vfs),
        None => rusqlite::Connection::open_with_flags(&config.location, flags),
    }
    .map_err(|e| DbalError::Open(e.to_string()))?;

    Ok(Box::new(SqliteDriver {
        conn: Rc::new(RefCell::new(conn)),
    }))
}

fn busy(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::DatabaseBusy)
}

fn exec_err(err: rusqlite::Error) -> DbalError {
    DbalError::Exec(err.to_string())
}

/// Engine-native textual rendering of one exec result cell.
fn exec_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn materialize(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn to_sqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Int(i) => rusqlite::types::Value::Integer(*i),
        Value::Float(f) => rusqlite::types::Value::Real(*f),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Blob(b) => rusqlite::types::Value::Blob(b.clone()),
        Value::Null => rusqlite::types::Value::Null,
    }
}

/// Run the statement to completion and copy every row out of the
/// driver-owned buffers.
fn run_query(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
) -> Result<(usize, Vec<Vec<Value>>), rusqlite::Error> {
    let mut stmt = conn.prepare_cached(sql)?;
    let ncols = stmt.column_count();
    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter().map(to_sqlite)))?;
    let mut materialized = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(ncols);
        for idx in 0..ncols {
            cells.push(materialize(row.get_ref(idx)?));
        }
        materialized.push(cells);
    }
    Ok((ncols, materialized))
}

impl DriverConnection for SqliteDriver {
    fn begin(&mut self) -> Result<(), DbalError> {
        self.conn
            .borrow()
            .execute_batch("BEGIN TRANSACTION")
            .map_err(exec_err)
    }

    fn commit(&mut self) -> Result<(), DbalError> {
        self.conn.borrow().execute_batch("COMMIT").map_err(exec_err)
    }

    fn rollback(&mut self) -> Result<(), DbalError> {
        self.conn
            .borrow()
            .execute_batch("ROLLBACK")
            .map_err(exec_err)
    }

    fn exec(
        &mut self,
        sql: &str,
        callback: Option<ExecRowCallback<'_>>,
    ) -> Result<(), DbalError> {
        let conn = self.conn.borrow();
        let Some(callback) = callback else {
            return conn.execute_batch(sql).map_err(exec_err);
        };

        let mut batch = Batch::new(&conn, sql);
        while let Some(mut stmt) = batch.next().map_err(exec_err)? {
            let ncols = stmt.column_count();
            let mut rows = stmt.query([]).map_err(exec_err)?;
            while let Some(row) = rows.next().map_err(exec_err)? {
                let mut values = Vec::with_capacity(ncols);
                for idx in 0..ncols {
                    values.push(exec_text(row.get_ref(idx).map_err(exec_err)?));
                }
                if callback(&values) == ExecAction::Abort {
                    return Err(DbalError::Exec("row callback aborted execution".to_string()));
                }
            }
        }
        Ok(())
    }

    fn last_insert_id(&mut self, _sequence: Option<&str>) -> Result<u64, DbalError> {
        numeric::i64_to_u64(self.conn.borrow().last_insert_rowid())
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn DriverStatement>, DbalError> {
        let (num_params, ncols) = {
            let conn = self.conn.borrow();
            let stmt = conn
                .prepare_cached(sql)
                .map_err(|e| DbalError::Prepare(e.to_string()))?;
            (stmt.parameter_count(), stmt.column_count())
        };
        Ok(Box::new(SqliteStatement {
            conn: Rc::clone(&self.conn),
            sql: sql.to_string(),
            params: vec![Value::Null; num_params],
            ncols,
            rows: RowBuffer::new(ncols),
        }))
    }

    fn native(&self) -> NativeConnection<'_> {
        NativeConnection::Sqlite(self.conn.borrow())
    }

    fn close(self: Box<Self>) -> Result<(), (Box<dyn DriverConnection>, DbalError)> {
        match Rc::try_unwrap(self.conn) {
            Ok(cell) => cell.into_inner().close().map_err(|(conn, err)| {
                (
                    Box::new(SqliteDriver {
                        conn: Rc::new(RefCell::new(conn)),
                    }) as Box<dyn DriverConnection>,
                    DbalError::Close(err.to_string()),
                )
            }),
            Err(conn) => Err((
                Box::new(SqliteDriver { conn }) as Box<dyn DriverConnection>,
                DbalError::Close("prepared statements are still open on this connection".to_string()),
            )),
        }
    }
}

struct SqliteStatement {
    conn: Rc<RefCell<rusqlite::Connection>>,
    sql: String,
    params: Vec<Value>,
    ncols: usize,
    rows: RowBuffer,
}

impl DriverStatement for SqliteStatement {
    fn param_count(&self) -> usize {
        self.params.len()
    }

    fn column_count(&self) -> usize {
        self.ncols
    }

    fn bind(&mut self, idx: usize, value: Value) -> Result<(), DbalError> {
        let slot = self
            .params
            .get_mut(idx)
            .ok_or_else(|| DbalError::Bind(format!("no parameter slot {idx}")))?;
        *slot = value;
        Ok(())
    }

    fn execute(&mut self) -> Result<(), DbalError> {
        let (ncols, materialized) = {
            let conn = self.conn.borrow();
            retry::with_busy_retry(|| run_query(&conn, &self.sql, &self.params), busy)
                .map_err(exec_err)?
        };
        self.ncols = ncols;
        self.rows.reset(ncols);
        for row in materialized {
            self.rows.push_row(row)?;
        }
        Ok(())
    }

    fn fetch(&mut self) -> Result<Fetched, DbalError> {
        Ok(self.rows.advance())
    }

    fn column(&self, idx: usize) -> Result<&Value, DbalError> {
        self.rows.cell(idx)
    }

    fn column_type(&self, idx: usize) -> Result<ColumnType, DbalError> {
        Ok(match self.rows.cell(idx)? {
            Value::Int(_) => ColumnType::Int,
            Value::Text(_) => ColumnType::Text,
            Value::Blob(_) => ColumnType::Blob,
            Value::Null => ColumnType::Null,
            Value::Float(_) => ColumnType::Other,
        })
    }

    fn native(&self) -> NativeStatement<'_> {
        NativeStatement::Sqlite(&self.sql)
    }

    fn close(&mut self) -> Result<(), DbalError> {
        self.params.clear();
        self.rows.reset(0);
        Ok(())
    }
}
