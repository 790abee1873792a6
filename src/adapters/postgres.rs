//! PostgreSQL adapter over the synchronous `postgres` client.
//!
//! Prepared statements hold the server-side statement handle; execution
//! runs the extended-protocol query and materializes the typed rows into
//! the shared result arena. Direct execution goes through the simple query
//! protocol so callbacks see the server's textual rendering of each cell.

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;
use std::time::Duration;

use bytes::BytesMut;
use postgres::config::SslMode;
use postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use postgres::{Client, NoTls, SimpleQueryMessage};

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

pub(crate) struct PostgresDriver {
    client: Rc<RefCell<Client>>,
}

pub(crate) fn open(config: &ConnectConfig) -> Result<Box<dyn DriverConnection>, DbalError> {
    let mut pg = postgres::Config::new();
    pg.host(&config.location);
    if let Some(port) = config.port {
        pg.port(port);
    }
    if let Some(username) = &config.username {
        pg.user(username);
    }
    if let Some(password) = &config.password {
        pg.password(password);
    }
    if let Some(database) = &config.database {
        pg.dbname(database);
    }

    for option in &config.options {
        match option.key.as_str() {
            "CONNECT_TIMEOUT" => {
                let secs = ConnectConfig::parse_timeout_secs(&option.value)?;
                pg.connect_timeout(Duration::from_secs(secs.into()));
            }
            "TLS_MODE" => {
                let mode = match option.value.as_str() {
                    "disable" => SslMode::Disable,
                    "allow" | "prefer" => SslMode::Prefer,
                    "require" | "verify-ca" | "verify-full" => SslMode::Require,
                    other => {
                        return Err(DbalError::Param(format!(
                            "unrecognized TLS_MODE value {other:?}"
                        )));
                    }
                };
                pg.ssl_mode(mode);
            }
            other => {
                return Err(DbalError::Param(format!(
                    "unrecognized PostgreSQL option {other:?}"
                )));
            }
        }
    }

    let client = pg
        .connect(NoTls)
        .map_err(|e| DbalError::Open(e.to_string()))?;
    Ok(Box::new(PostgresDriver {
        client: Rc::new(RefCell::new(client)),
    }))
}

fn exec_err(err: postgres::Error) -> DbalError {
    DbalError::Exec(err.to_string())
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(i) => {
                if *ty == Type::INT2 {
                    i16::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR {
                    i.to_string().to_sql(ty, out)
                } else {
                    i.to_sql(ty, out)
                }
            }
            Value::Float(f) => {
                if *ty == Type::FLOAT4 {
                    (*f as f32).to_sql(ty, out)
                } else {
                    f.to_sql(ty, out)
                }
            }
            Value::Text(s) => s.to_sql(ty, out),
            Value::Blob(b) => b.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Decode one typed cell into the engine-neutral representation.
fn extract_value(row: &postgres::Row, idx: usize) -> Result<Value, DbalError> {
    let coerce = |e: postgres::Error| DbalError::ColumnCoerce(e.to_string());
    let ty = row.columns()[idx].type_();
    let value = match ty.name() {
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, |v| Value::Int(v.into())),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, |v| Value::Int(v.into())),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, Value::Int),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, |v| Value::Float(v.into())),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, Value::Float),
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, |v| Value::Int(i64::from(v))),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, Value::Blob),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map_err(coerce)?
            .map_or(Value::Null, Value::Text),
    };
    Ok(value)
}

impl DriverConnection for PostgresDriver {
    fn begin(&mut self) -> Result<(), DbalError> {
        self.client
            .borrow_mut()
            .batch_execute("BEGIN")
            .map_err(exec_err)
    }

    fn commit(&mut self) -> Result<(), DbalError> {
        self.client
            .borrow_mut()
            .batch_execute("COMMIT")
            .map_err(exec_err)
    }

    fn rollback(&mut self) -> Result<(), DbalError> {
        self.client
            .borrow_mut()
            .batch_execute("ROLLBACK")
            .map_err(exec_err)
    }

    fn exec(
        &mut self,
        sql: &str,
        callback: Option<ExecRowCallback<'_>>,
    ) -> Result<(), DbalError> {
        let Some(callback) = callback else {
            return self.client.borrow_mut().batch_execute(sql).map_err(exec_err);
        };

        let messages = self.client.borrow_mut().simple_query(sql).map_err(exec_err)?;
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let mut values = Vec::with_capacity(row.len());
                for idx in 0..row.len() {
                    values.push(row.get(idx).map(str::to_string));
                }
                if callback(&values) == ExecAction::Abort {
                    return Err(DbalError::Exec("row callback aborted execution".to_string()));
                }
            }
        }
        Ok(())
    }

    fn last_insert_id(&mut self, sequence: Option<&str>) -> Result<u64, DbalError> {
        let sequence = sequence.ok_or_else(|| {
            DbalError::Param("the PostgreSQL driver requires a sequence name".to_string())
        })?;
        // currval takes a regclass; quote the name so it passes through as a
        // literal identifier.
        let sql = format!("SELECT currval('{}')", sequence.replace('\'', "''"));
        let row = self
            .client
            .borrow_mut()
            .query_one(&sql, &[])
            .map_err(exec_err)?;
        let id: i64 = row
            .try_get(0)
            .map_err(|e| DbalError::ColumnCoerce(e.to_string()))?;
        numeric::i64_to_u64(id)
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn DriverStatement>, DbalError> {
        let stmt = self
            .client
            .borrow_mut()
            .prepare(sql)
            .map_err(|e| DbalError::Prepare(e.to_string()))?;
        let num_params = stmt.params().len();
        let ncols = stmt.columns().len();
        Ok(Box::new(PostgresStatement {
            client: Rc::clone(&self.client),
            stmt,
            params: vec![Value::Null; num_params],
            ncols,
            rows: RowBuffer::new(ncols),
        }))
    }

    fn native(&self) -> NativeConnection<'_> {
        NativeConnection::Postgres(self.client.borrow())
    }

    fn close(self: Box<Self>) -> Result<(), (Box<dyn DriverConnection>, DbalError)> {
        match Rc::try_unwrap(self.client) {
            // Dropping the client sends Terminate and tears the socket down.
            Ok(cell) => {
                drop(cell.into_inner());
                Ok(())
            }
            Err(client) => Err((
                Box::new(PostgresDriver { client }) as Box<dyn DriverConnection>,
                DbalError::Close("prepared statements are still open on this connection".to_string()),
            )),
        }
    }
}

struct PostgresStatement {
    client: Rc<RefCell<Client>>,
    stmt: postgres::Statement,
    params: Vec<Value>,
    ncols: usize,
    rows: RowBuffer,
}

impl DriverStatement for PostgresStatement {
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
        let refs: Vec<&(dyn ToSql + Sync)> = self
            .params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();
        let result = self
            .client
            .borrow_mut()
            .query(&self.stmt, &refs)
            .map_err(exec_err)?;

        self.rows.reset(self.ncols);
        for row in &result {
            let mut cells = Vec::with_capacity(self.ncols);
            for idx in 0..self.ncols {
                cells.push(extract_value(row, idx)?);
            }
            self.rows.push_row(cells)?;
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
        NativeStatement::Postgres(&self.stmt)
    }

    fn close(&mut self) -> Result<(), DbalError> {
        self.params.clear();
        self.rows.reset(0);
        Ok(())
    }
}
