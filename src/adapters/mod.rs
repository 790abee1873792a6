//! Driver adapters and the capability table they implement.
//!
//! [`DriverConnection`] and [`DriverStatement`] together are the fixed set
//! of operation slots every driver must fill. Exactly one adapter is
//! selected per connection by [`open_driver`]; after that, the core
//! forwards every call through the trait object and contains no
//! driver-specific branching of its own.

pub(crate) mod rows;

#[cfg(feature = "mariadb")]
pub(crate) mod mariadb;
#[cfg(feature = "postgres")]
pub(crate) mod postgres;
#[cfg(feature = "sqlite")]
pub(crate) mod sqlite;

use crate::config::{ConnectConfig, DriverKind};
use crate::connection::ExecAction;
use crate::error::DbalError;
use crate::statement::Fetched;
use crate::value::{ColumnType, Value};

/// Per-row callback used by direct execution, invoked with one
/// engine-native textual value per column (`None` for SQL NULL).
pub(crate) type ExecRowCallback<'a> = &'a mut dyn FnMut(&[Option<String>]) -> ExecAction;

/// Connection-level operation slots of the capability table.
pub(crate) trait DriverConnection {
    fn begin(&mut self) -> Result<(), DbalError>;
    fn commit(&mut self) -> Result<(), DbalError>;
    fn rollback(&mut self) -> Result<(), DbalError>;
    fn exec(&mut self, sql: &str, callback: Option<ExecRowCallback<'_>>)
    -> Result<(), DbalError>;
    fn last_insert_id(&mut self, sequence: Option<&str>) -> Result<u64, DbalError>;
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn DriverStatement>, DbalError>;
    fn native(&self) -> NativeConnection<'_>;
    /// Release the underlying engine handle. On failure the adapter is
    /// handed back so the caller can retry the close.
    fn close(self: Box<Self>) -> Result<(), (Box<dyn DriverConnection>, DbalError)>;
}

/// Statement-level operation slots of the capability table.
///
/// Index arguments arrive pre-validated: the statement layer range-checks
/// them against the counts reported here before forwarding.
pub(crate) trait DriverStatement {
    fn param_count(&self) -> usize;
    fn column_count(&self) -> usize;
    fn bind(&mut self, idx: usize, value: Value) -> Result<(), DbalError>;
    fn execute(&mut self) -> Result<(), DbalError>;
    fn fetch(&mut self) -> Result<Fetched, DbalError>;
    fn column(&self, idx: usize) -> Result<&Value, DbalError>;
    fn column_type(&self, idx: usize) -> Result<ColumnType, DbalError>;
    fn native(&self) -> NativeStatement<'_>;
    fn close(&mut self) -> Result<(), DbalError>;
}

/// Borrowed view of the underlying engine connection handle, for
/// driver-specific code the generic surface cannot express.
pub enum NativeConnection<'a> {
    #[cfg(feature = "mariadb")]
    Mariadb(std::cell::Ref<'a, mysql::Conn>),
    #[cfg(feature = "postgres")]
    Postgres(std::cell::Ref<'a, ::postgres::Client>),
    #[cfg(feature = "sqlite")]
    Sqlite(std::cell::Ref<'a, rusqlite::Connection>),
}

/// Borrowed view of the underlying engine statement handle.
///
/// The SQLite adapter keeps compiled statements in the connection's
/// statement cache rather than holding one across calls, so its variant
/// exposes the source SQL.
pub enum NativeStatement<'a> {
    #[cfg(feature = "mariadb")]
    Mariadb(&'a mysql::Statement),
    #[cfg(feature = "postgres")]
    Postgres(&'a ::postgres::Statement),
    #[cfg(feature = "sqlite")]
    Sqlite(&'a str),
}

/// Select and open the adapter for `kind`.
///
/// This factory is the only place in the core that branches on the driver
/// identifier. A driver that is not compiled into the build yields
/// [`DbalError::DriverNoSupport`] and no adapter is installed.
pub(crate) fn open_driver(
    kind: DriverKind,
    config: &ConnectConfig,
) -> Result<Box<dyn DriverConnection>, DbalError> {
    match kind {
        #[cfg(feature = "mariadb")]
        DriverKind::Mariadb | DriverKind::Mysql => mariadb::open(config),
        #[cfg(feature = "postgres")]
        DriverKind::Postgres => postgres::open(config),
        #[cfg(feature = "sqlite")]
        DriverKind::Sqlite => sqlite::open(config),
        #[allow(unreachable_patterns)]
        _ => Err(DbalError::DriverNoSupport(format!(
            "the {} driver is not compiled into this build",
            kind.as_str()
        ))),
    }
}
