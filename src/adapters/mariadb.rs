//! MariaDB/MySQL adapter over the synchronous `mysql` client.
//!
//! Prepared statements use the binary protocol; execution drains every
//! result set into the shared result arena so the connection is free for
//! the next command. Direct execution uses the text protocol and renders
//! each cell the way the server would print it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder, Params, Value as MysqlValue};

use crate::adapters::rows::RowBuffer;
use crate::adapters::{
    DriverConnection, DriverStatement, ExecRowCallback, NativeConnection, NativeStatement,
};
use crate::config::ConnectConfig;
use crate::connection::ExecAction;
use crate::error::DbalError;
use crate::numeric;
use crate::statement::Fetched;
use crate::value::{ColumnType, Value};

pub(crate) struct MariadbDriver {
    conn: Rc<RefCell<Conn>>,
}

pub(crate) fn open(config: &ConnectConfig) -> Result<Box<dyn DriverConnection>, DbalError> {
    let mut builder = OptsBuilder::new()
        .ip_or_hostname(Some(config.location.clone()))
        .user(config.username.clone())
        .pass(config.password.clone())
        .db_name(config.database.clone());
    if let Some(port) = config.port {
        builder = builder.tcp_port(port);
    }

    for option in &config.options {
        match option.key.as_str() {
            "CONNECT_TIMEOUT" => {
                let secs = ConnectConfig::parse_timeout_secs(&option.value)?;
                builder = builder.tcp_connect_timeout(Some(Duration::from_secs(secs.into())));
            }
            other => {
                return Err(DbalError::Param(format!(
                    "unrecognized MariaDB option {other:?}"
                )));
            }
        }
    }

    let conn = Conn::new(builder).map_err(|e| DbalError::Open(e.to_string()))?;
    Ok(Box::new(MariadbDriver {
        conn: Rc::new(RefCell::new(conn)),
    }))
}

fn exec_err(err: mysql::Error) -> DbalError {
    DbalError::Exec(err.to_string())
}

fn to_mysql(value: &Value) -> MysqlValue {
    match value {
        Value::Int(i) => MysqlValue::Int(*i),
        Value::Float(f) => MysqlValue::Double(*f),
        Value::Text(s) => MysqlValue::Bytes(s.clone().into_bytes()),
        Value::Blob(b) => MysqlValue::Bytes(b.clone()),
        Value::Null => MysqlValue::NULL,
    }
}

fn from_mysql(value: Option<&MysqlValue>) -> Value {
    match value {
        None | Some(MysqlValue::NULL) => Value::Null,
        Some(MysqlValue::Bytes(bytes)) => Value::Blob(bytes.clone()),
        Some(MysqlValue::Int(i)) => Value::Int(*i),
        // An unsigned value past i64::MAX survives as its decimal rendering.
        Some(MysqlValue::UInt(u)) => match numeric::u64_to_i64(*u) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Text(u.to_string()),
        },
        Some(MysqlValue::Float(f)) => Value::Float((*f).into()),
        Some(MysqlValue::Double(f)) => Value::Float(*f),
        Some(temporal) => Value::Text(format_temporal(temporal)),
    }
}

/// Render DATE/DATETIME/TIME values the way the text protocol would.
fn format_temporal(value: &MysqlValue) -> String {
    match *value {
        MysqlValue::Date(year, month, day, 0, 0, 0, 0) => {
            format!("{year:04}-{month:02}-{day:02}")
        }
        MysqlValue::Date(year, month, day, hour, minute, second, 0) => {
            format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
        }
        MysqlValue::Date(year, month, day, hour, minute, second, micros) => format!(
            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
        ),
        MysqlValue::Time(negative, days, hours, minutes, seconds, 0) => {
            let sign = if negative { "-" } else { "" };
            let hours = u32::from(days) * 24 + u32::from(hours);
            format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
        }
        MysqlValue::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = u32::from(days) * 24 + u32::from(hours);
            format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
        }
        _ => String::new(),
    }
}

fn exec_text(value: &MysqlValue) -> Option<String> {
    match value {
        MysqlValue::NULL => None,
        MysqlValue::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        MysqlValue::Int(i) => Some(i.to_string()),
        MysqlValue::UInt(u) => Some(u.to_string()),
        MysqlValue::Float(f) => Some(f.to_string()),
        MysqlValue::Double(f) => Some(f.to_string()),
        temporal => Some(format_temporal(temporal)),
    }
}

impl DriverConnection for MariadbDriver {
    fn begin(&mut self) -> Result<(), DbalError> {
        self.conn
            .borrow_mut()
            .query_drop("START TRANSACTION")
            .map_err(exec_err)
    }

    fn commit(&mut self) -> Result<(), DbalError> {
        self.conn
            .borrow_mut()
            .query_drop("COMMIT")
            .map_err(exec_err)
    }

    fn rollback(&mut self) -> Result<(), DbalError> {
        self.conn
            .borrow_mut()
            .query_drop("ROLLBACK")
            .map_err(exec_err)
    }

    fn exec(
        &mut self,
        sql: &str,
        callback: Option<ExecRowCallback<'_>>,
    ) -> Result<(), DbalError> {
        let mut conn = self.conn.borrow_mut();
        let Some(callback) = callback else {
            return conn.query_drop(sql).map_err(exec_err);
        };

        let mut result = conn.query_iter(sql).map_err(exec_err)?;
        while let Some(result_set) = result.iter() {
            for row in result_set {
                let row = row.map_err(exec_err)?;
                let mut values = Vec::with_capacity(row.len());
                for idx in 0..row.len() {
                    values.push(row.as_ref(idx).and_then(exec_text));
                }
                if callback(&values) == ExecAction::Abort {
                    return Err(DbalError::Exec("row callback aborted execution".to_string()));
                }
            }
        }
        Ok(())
    }

    fn last_insert_id(&mut self, _sequence: Option<&str>) -> Result<u64, DbalError> {
        Ok(self.conn.borrow().last_insert_id())
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn DriverStatement>, DbalError> {
        let stmt = self
            .conn
            .borrow_mut()
            .prep(sql)
            .map_err(|e| DbalError::Prepare(e.to_string()))?;
        let num_params = usize::from(stmt.num_params());
        let ncols = usize::from(stmt.num_columns());
        Ok(Box::new(MariadbStatement {
            conn: Rc::clone(&self.conn),
            stmt,
            params: vec![Value::Null; num_params],
            ncols,
            rows: RowBuffer::new(ncols),
        }))
    }

    fn native(&self) -> NativeConnection<'_> {
        NativeConnection::Mariadb(self.conn.borrow())
    }

    fn close(self: Box<Self>) -> Result<(), (Box<dyn DriverConnection>, DbalError)> {
        match Rc::try_unwrap(self.conn) {
            // Dropping the connection sends COM_QUIT.
            Ok(cell) => {
                drop(cell.into_inner());
                Ok(())
            }
            Err(conn) => Err((
                Box::new(MariadbDriver { conn }) as Box<dyn DriverConnection>,
                DbalError::Close("prepared statements are still open on this connection".to_string()),
            )),
        }
    }
}

struct MariadbStatement {
    conn: Rc<RefCell<Conn>>,
    stmt: mysql::Statement,
    params: Vec<Value>,
    ncols: usize,
    rows: RowBuffer,
}

impl DriverStatement for MariadbStatement {
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
        let mut conn = self.conn.borrow_mut();
        let params = if self.params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(self.params.iter().map(to_mysql).collect())
        };
        let mut result = conn.exec_iter(&self.stmt, params).map_err(exec_err)?;

        let mut materialized = Vec::new();
        while let Some(result_set) = result.iter() {
            for row in result_set {
                let row = row.map_err(exec_err)?;
                let mut cells = Vec::with_capacity(row.len());
                for idx in 0..row.len() {
                    cells.push(from_mysql(row.as_ref(idx)));
                }
                materialized.push(cells);
            }
        }
        drop(result);
        drop(conn);

        self.rows.reset(self.ncols);
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
            Value::Null => ColumnType::Null,
            _ => ColumnType::Blob,
        })
    }

    fn native(&self) -> NativeStatement<'_> {
        NativeStatement::Mariadb(&self.stmt)
    }

    fn close(&mut self) -> Result<(), DbalError> {
        self.params.clear();
        self.rows.reset(0);
        self.conn
            .borrow_mut()
            .close(self.stmt.clone())
            .map_err(|e| DbalError::Close(e.to_string()))
    }
}
