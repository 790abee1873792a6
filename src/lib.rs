//! Driver-agnostic synchronous SQL client.
//!
//! One [`Connection`] API covers MariaDB/MySQL, PostgreSQL, and SQLite;
//! the engine is picked at open time with a [`DriverKind`] and everything
//! after that goes through the same calls. Statements follow the classic
//! prepare / bind / execute / fetch lifecycle, values cross the boundary in
//! an engine-neutral form, and every operation reports failures both as a
//! `Result` and as a sticky status code on the connection.
//!
//! ```no_run
//! use sql_dbal::{ConnectConfig, Connection, DriverKind, Fetched};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectConfig::new("app.sqlite3");
//! let mut conn = Connection::open(DriverKind::Sqlite, &config)?;
//! conn.execute_batch("CREATE TABLE t (a INTEGER, b TEXT)")?;
//!
//! let mut stmt = conn.prepare("INSERT INTO t (a, b) VALUES (?, ?)")?;
//! stmt.bind_int64(0, 10)?;
//! stmt.bind_text(1, "hello")?;
//! stmt.execute()?;
//! stmt.close()?;
//!
//! let mut stmt = conn.prepare("SELECT a, b FROM t WHERE a = ?")?;
//! stmt.bind_int64(0, 10)?;
//! stmt.execute()?;
//! while stmt.fetch()? == Fetched::Row {
//!     let a = stmt.column_int64(0)?;
//!     let b = stmt.column_text(1)?;
//!     println!("{a:?} {b:?}");
//! }
//! stmt.close()?;
//! conn.close().map_err(|(_, e)| e)?;
//! # Ok(())
//! # }
//! ```
//!
//! Driver support is feature-gated (`sqlite`, `postgres`, `mariadb`, all on
//! by default). Opening a driver that is not compiled in fails with
//! [`DbalError::DriverNoSupport`].

mod adapters;
mod config;
mod connection;
mod error;
pub mod numeric;
mod retry;
mod statement;
mod value;

pub use adapters::{NativeConnection, NativeStatement};
pub use config::{ConnectConfig, DriverKind, DriverOption, Flags};
pub use connection::{Connection, ExecAction};
pub use error::{DbalError, Status};
pub use statement::{Fetched, Statement};
pub use value::{ColumnType, Value};

/// Convenience re-export of the types most applications need.
pub mod prelude {
    pub use crate::{
        ConnectConfig, Connection, DbalError, DriverKind, ExecAction, Fetched, Flags, Statement,
        Status,
    };
}
