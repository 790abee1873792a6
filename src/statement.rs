//! Prepared statement lifecycle: bind, execute, fetch, column reads.

use std::rc::Rc;

use crate::adapters::{DriverStatement, NativeStatement};
use crate::connection::SessionState;
use crate::error::DbalError;
use crate::value::{ColumnType, Value};

/// Outcome of one [`Statement::fetch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    /// The next row is available; read it with the column accessors.
    Row,
    /// No more rows exist in the result set.
    Done,
}

/// One compiled, reusable statement bound to the connection that prepared
/// it.
///
/// Operations follow a fixed order: bind (any number of times), execute,
/// then fetch and column reads; the statement can then be re-bound and
/// re-executed. Parameter and column indices are range-checked here before
/// anything is forwarded to the driver adapter, so out-of-range access
/// never reaches the native library.
pub struct Statement {
    driver: Box<dyn DriverStatement>,
    session: Rc<SessionState>,
    num_params: usize,
    num_cols: usize,
}

impl Statement {
    pub(crate) fn new(driver: Box<dyn DriverStatement>, session: Rc<SessionState>) -> Statement {
        let num_params = driver.param_count();
        let num_cols = driver.column_count();
        Statement {
            driver,
            session,
            num_params,
            num_cols,
        }
    }

    /// Number of bindable placeholders, fixed at prepare time.
    pub fn param_count(&self) -> usize {
        self.num_params
    }

    /// Number of result columns; 0 for statements that return no rows.
    pub fn column_count(&self) -> usize {
        self.num_cols
    }

    fn check_param_index(&self, idx: usize) -> Result<(), DbalError> {
        if idx >= self.num_params {
            Err(self.session.fail(DbalError::Param(format!(
                "parameter index {idx} out of range for statement with {} placeholders",
                self.num_params
            ))))
        } else {
            Ok(())
        }
    }

    fn check_column_index(&self, idx: usize) -> Result<(), DbalError> {
        if idx >= self.num_cols {
            Err(self.session.fail(DbalError::Param(format!(
                "column index {idx} out of range for statement with {} result columns",
                self.num_cols
            ))))
        } else {
            Ok(())
        }
    }

    fn bind(&mut self, idx: usize, value: Value) -> Result<(), DbalError> {
        self.check_param_index(idx)?;
        let result = self.driver.bind(idx, value);
        self.session.check(result)
    }

    /// Bind binary data to the placeholder at `idx` (0-based).
    ///
    /// The bytes are copied into the statement's parameter arena; rebinding
    /// the same index replaces the previous value.
    pub fn bind_blob(&mut self, idx: usize, blob: impl Into<Vec<u8>>) -> Result<(), DbalError> {
        self.session.trace("bind_blob", || format!("idx={idx}"));
        self.bind(idx, Value::Blob(blob.into()))
    }

    /// Bind a 64-bit integer to the placeholder at `idx`.
    pub fn bind_int64(&mut self, idx: usize, value: i64) -> Result<(), DbalError> {
        self.session
            .trace("bind_int64", || format!("idx={idx} value={value}"));
        self.bind(idx, Value::Int(value))
    }

    /// Bind a string to the placeholder at `idx`.
    pub fn bind_text(&mut self, idx: usize, text: impl Into<String>) -> Result<(), DbalError> {
        self.session.trace("bind_text", || format!("idx={idx}"));
        self.bind(idx, Value::Text(text.into()))
    }

    /// Bind SQL NULL to the placeholder at `idx`.
    pub fn bind_null(&mut self, idx: usize) -> Result<(), DbalError> {
        self.session.trace("bind_null", || format!("idx={idx}"));
        self.bind(idx, Value::Null)
    }

    /// Execute the statement with the currently bound parameters.
    ///
    /// Parameters keep their values across executions; placeholders that
    /// were never bound execute as SQL NULL. On return the statement is
    /// positioned before the first result row and the column count is
    /// fixed for this execution.
    pub fn execute(&mut self) -> Result<(), DbalError> {
        self.session.trace("execute", String::new);
        let result = self.driver.execute();
        self.session.check(result)?;
        self.num_cols = self.driver.column_count();
        Ok(())
    }

    /// Advance to the next row of the result set.
    ///
    /// Columns of the previous row become invalid as soon as this is called
    /// again.
    pub fn fetch(&mut self) -> Result<Fetched, DbalError> {
        self.session.trace("fetch", String::new);
        let result = self.driver.fetch();
        self.session.check(result)
    }

    /// Read column `idx` of the current row as binary data.
    ///
    /// A SQL NULL yields `Ok(None)`, not an error.
    pub fn column_blob(&self, idx: usize) -> Result<Option<Vec<u8>>, DbalError> {
        self.check_column_index(idx)?;
        let value = self.session.check(self.driver.column(idx))?;
        self.session.check(value.to_blob())
    }

    /// Read column `idx` of the current row as a 64-bit integer.
    ///
    /// Textual values must parse as a complete, in-range base-10 integer;
    /// otherwise the read fails with a column-coercion status. A SQL NULL
    /// yields `Ok(None)`.
    pub fn column_int64(&self, idx: usize) -> Result<Option<i64>, DbalError> {
        self.check_column_index(idx)?;
        let value = self.session.check(self.driver.column(idx))?;
        self.session.check(value.to_int64())
    }

    /// Read column `idx` of the current row as a string.
    ///
    /// A SQL NULL yields `Ok(None)`, not an error.
    pub fn column_text(&self, idx: usize) -> Result<Option<String>, DbalError> {
        self.check_column_index(idx)?;
        let value = self.session.check(self.driver.column(idx))?;
        self.session.check(value.to_text())
    }

    /// Data type of column `idx` in the current row.
    ///
    /// The PostgreSQL and MariaDB adapters only distinguish
    /// [`ColumnType::Null`] from [`ColumnType::Blob`].
    pub fn column_type(&self, idx: usize) -> Result<ColumnType, DbalError> {
        self.check_column_index(idx)?;
        let result = self.driver.column_type(idx);
        self.session.check(result)
    }

    /// Borrow the underlying engine statement handle.
    pub fn native(&self) -> NativeStatement<'_> {
        self.driver.native()
    }

    /// Release the statement and every parameter and result buffer it
    /// holds. Dropping the statement releases the same resources; `close`
    /// additionally reports driver-side failures.
    pub fn close(mut self) -> Result<(), DbalError> {
        self.session.trace("stmt_close", String::new);
        let result = self.driver.close();
        self.session.check(result)
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("num_params", &self.num_params)
            .field("num_cols", &self.num_cols)
            .finish_non_exhaustive()
    }
}
