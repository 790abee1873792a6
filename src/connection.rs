//! Connection lifecycle and status/error bookkeeping.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::adapters::{self, DriverConnection, NativeConnection};
use crate::config::{ConnectConfig, DriverKind, Flags};
use crate::error::{DbalError, Status};
use crate::statement::Statement;

/// Flow control returned by the per-row callback of [`Connection::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecAction {
    /// Keep delivering result rows.
    Continue,
    /// Stop; the exec call fails with an execution status.
    Abort,
}

/// Status and error-string state shared between a connection and the
/// statements prepared from it. Statements hold this by `Rc` as a
/// back-reference for error recording only; they do not own the connection.
pub(crate) struct SessionState {
    kind: DriverKind,
    debug: bool,
    status: Cell<Status>,
    message: RefCell<Option<String>>,
}

impl SessionState {
    fn new(kind: DriverKind, debug: bool) -> SessionState {
        SessionState {
            kind,
            debug,
            status: Cell::new(Status::Ok),
            message: RefCell::new(None),
        }
    }

    /// Record a failure: the status code plus an owned copy of the message,
    /// replacing (never appending to) any previous error.
    pub(crate) fn fail(&self, err: DbalError) -> DbalError {
        self.status.set(err.status());
        *self.message.borrow_mut() = Some(err.to_string());
        err
    }

    pub(crate) fn check<T>(&self, result: Result<T, DbalError>) -> Result<T, DbalError> {
        result.map_err(|err| self.fail(err))
    }

    pub(crate) fn trace(&self, op: &'static str, detail: impl FnOnce() -> String) {
        if self.debug {
            tracing::debug!(driver = self.kind.as_str(), op, detail = detail());
        }
    }
}

/// One open session with a backing SQL engine.
///
/// All operations are synchronous and block until the underlying driver
/// call returns. A `Connection` and the statements prepared from it must
/// not be shared across threads without external synchronization.
pub struct Connection {
    kind: DriverKind,
    driver: Option<Box<dyn DriverConnection>>,
    session: Rc<SessionState>,
}

impl Connection {
    /// Open a new connection using the adapter selected by `kind`.
    ///
    /// An unknown flag bit, an unrecognized driver option, or a driver that
    /// is not compiled into this build fails the open; no partially
    /// initialized connection is ever returned.
    ///
    /// # Errors
    /// [`DbalError::DriverNoSupport`] when the driver is unavailable,
    /// [`DbalError::Param`] for invalid flags/options, and
    /// [`DbalError::Open`] when the engine rejects the connection.
    pub fn open(kind: DriverKind, config: &ConnectConfig) -> Result<Connection, DbalError> {
        config.flags.validate(kind)?;
        let driver = adapters::open_driver(kind, config)?;
        let session = Rc::new(SessionState::new(kind, config.flags.contains(Flags::DEBUG)));
        session.trace("open", || config.location.clone());
        Ok(Connection {
            kind,
            driver: Some(driver),
            session,
        })
    }

    /// The driver this connection was opened with.
    pub fn driver_kind(&self) -> DriverKind {
        self.kind
    }

    /// The status code recorded by the most recent failing operation, or
    /// [`Status::Ok`] if none has failed since the last clear.
    pub fn last_status(&self) -> Status {
        self.session.status.get()
    }

    /// Reset the recorded status to [`Status::Ok`] and return the previous
    /// value. Lets callers recover from a soft error and keep using the
    /// connection.
    pub fn clear_status(&self) -> Status {
        let previous = self.session.status.replace(Status::Ok);
        self.session.message.borrow_mut().take();
        previous
    }

    /// Human-readable description of the most recent failure: the
    /// driver-supplied message when one exists, otherwise the fixed string
    /// for the current status code.
    pub fn error_string(&self) -> String {
        self.session
            .message
            .borrow()
            .clone()
            .unwrap_or_else(|| self.last_status().message().to_string())
    }

    fn with_driver<T>(
        &mut self,
        f: impl FnOnce(&mut (dyn DriverConnection + 'static)) -> Result<T, DbalError>,
    ) -> Result<T, DbalError> {
        let session = Rc::clone(&self.session);
        let driver = self
            .driver
            .as_deref_mut()
            .ok_or_else(|| DbalError::Param("connection already closed".to_string()));
        session.check(driver.and_then(f))
    }

    /// Start a new transaction.
    pub fn begin_transaction(&mut self) -> Result<(), DbalError> {
        self.session.trace("begin_transaction", String::new);
        self.with_driver(|d| d.begin())
    }

    /// Commit the transaction started by [`Connection::begin_transaction`].
    pub fn commit(&mut self) -> Result<(), DbalError> {
        self.session.trace("commit", String::new);
        self.with_driver(|d| d.commit())
    }

    /// Roll back the transaction started by
    /// [`Connection::begin_transaction`].
    pub fn rollback(&mut self) -> Result<(), DbalError> {
        self.session.trace("rollback", String::new);
        self.with_driver(|d| d.rollback())
    }

    /// Execute SQL directly, invoking `callback` once per result row with
    /// the engine-native textual value of each column (`None` for NULL).
    ///
    /// Returning [`ExecAction::Abort`] from the callback stops row delivery
    /// and fails the call with an execution status.
    pub fn exec<F>(&mut self, sql: &str, mut callback: F) -> Result<(), DbalError>
    where
        F: FnMut(&[Option<String>]) -> ExecAction,
    {
        self.session.trace("exec", || sql.to_string());
        self.with_driver(|d| d.exec(sql, Some(&mut callback)))
    }

    /// Execute one or more SQL statements directly, discarding any rows.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), DbalError> {
        self.session.trace("execute_batch", || sql.to_string());
        self.with_driver(|d| d.exec(sql, None))
    }

    /// Row identifier generated by the last insert.
    ///
    /// The PostgreSQL adapter requires `sequence`, the name of the sequence
    /// backing the inserted key (for a SERIAL column `id` on table `t`,
    /// `"t_id_seq"`); the other drivers ignore it.
    pub fn last_insert_id(&mut self, sequence: Option<&str>) -> Result<u64, DbalError> {
        self.session.trace("last_insert_id", String::new);
        self.with_driver(|d| d.last_insert_id(sequence))
    }

    /// Compile `sql` into a reusable [`Statement`].
    ///
    /// # Errors
    /// [`DbalError::Prepare`] when the engine rejects the statement.
    pub fn prepare(&mut self, sql: &str) -> Result<Statement, DbalError> {
        self.session.trace("prepare", || sql.to_string());
        let session = Rc::clone(&self.session);
        let driver = self.with_driver(|d| d.prepare(sql))?;
        Ok(Statement::new(driver, session))
    }

    /// Borrow the underlying engine connection handle for driver-specific
    /// code. Resources must still be released through [`Connection::close`].
    pub fn native(&self) -> Result<NativeConnection<'_>, DbalError> {
        match self.driver.as_deref() {
            Some(driver) => Ok(driver.native()),
            None => Err(DbalError::Param("connection already closed".to_string())),
        }
    }

    /// Close the connection and release the engine handle.
    ///
    /// If the driver-level close fails (for example because prepared
    /// statements are still open), the connection is handed back unchanged
    /// so the caller can inspect the error and retry.
    pub fn close(mut self) -> Result<(), (Connection, DbalError)> {
        self.session.trace("close", String::new);
        match self.driver.take() {
            None => Ok(()),
            Some(driver) => match driver.close() {
                Ok(()) => Ok(()),
                Err((driver, err)) => {
                    let err = self.session.fail(err);
                    self.driver = Some(driver);
                    Err((self, err))
                }
            },
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.kind)
            .field("status", &self.last_status())
            .finish_non_exhaustive()
    }
}
