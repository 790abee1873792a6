//! Connection configuration: driver selection, flags, and driver options.

use clap::ValueEnum;

use crate::error::DbalError;

/// The SQL engines this crate can dispatch to.
///
/// `Mariadb` and `Mysql` select the same adapter; they are distinct values
/// because applications may need to distinguish the two server families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DriverKind {
    /// MariaDB server, via the MySQL wire protocol.
    Mariadb,
    /// MySQL server.
    Mysql,
    /// PostgreSQL server.
    Postgres,
    /// Embedded SQLite database file.
    Sqlite,
}

impl DriverKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DriverKind::Mariadb => "mariadb",
            DriverKind::Mysql => "mysql",
            DriverKind::Postgres => "postgres",
            DriverKind::Sqlite => "sqlite",
        }
    }
}

/// Bit-set of connection open flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    /// No flags.
    pub const NONE: Flags = Flags(0);
    /// Emit a `tracing` debug event for every operation on the connection.
    pub const DEBUG: Flags = Flags(1);
    /// Open the SQLite database read-only.
    pub const SQLITE_OPEN_READONLY: Flags = Flags(1 << 16);
    /// Open the SQLite database read-write.
    pub const SQLITE_OPEN_READWRITE: Flags = Flags(1 << 17);
    /// Create the SQLite database file if it does not exist yet.
    pub const SQLITE_OPEN_CREATE: Flags = Flags(1 << 18);

    const KNOWN: u32 = Flags::DEBUG.0
        | Flags::SQLITE_OPEN_READONLY.0
        | Flags::SQLITE_OPEN_READWRITE.0
        | Flags::SQLITE_OPEN_CREATE.0;

    const SQLITE_ONLY: u32 = Flags::SQLITE_OPEN_READONLY.0
        | Flags::SQLITE_OPEN_READWRITE.0
        | Flags::SQLITE_OPEN_CREATE.0;

    /// True if every bit of `other` is set in `self`.
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Validate the bit-set for the selected driver.
    ///
    /// Unknown bits are rejected rather than silently ignored, as are the
    /// SQLite file-mode bits on client/server drivers.
    pub(crate) fn validate(self, kind: DriverKind) -> Result<(), DbalError> {
        if self.0 & !Flags::KNOWN != 0 {
            return Err(DbalError::Param(format!(
                "unknown connection flag bits {:#x}",
                self.0 & !Flags::KNOWN
            )));
        }
        if kind != DriverKind::Sqlite && self.0 & Flags::SQLITE_ONLY != 0 {
            return Err(DbalError::Param(format!(
                "SQLite file-mode flags are not valid for the {} driver",
                kind.as_str()
            )));
        }
        Ok(())
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// One driver-specific key/value tuning option.
///
/// Recognized keys by driver:
/// - SQLite: `VFS` (virtual file system name).
/// - PostgreSQL: `CONNECT_TIMEOUT` (seconds), `TLS_MODE` (`disable`,
///   `allow`, `prefer`, `require`, `verify-ca`, `verify-full`).
/// - MariaDB/MySQL: `CONNECT_TIMEOUT` (seconds).
///
/// An unrecognized key fails the open with an invalid-parameter status
/// rather than being silently ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOption {
    /// Unique identifier naming the option.
    pub key: String,
    /// Value corresponding to `key`.
    pub value: String,
}

/// Connection parameters shared by every driver.
///
/// `location` is a file path for SQLite and a host name or IP address for
/// the client/server drivers; the remaining fields are ignored by drivers
/// that have no use for them.
#[derive(Debug, Clone, Default)]
pub struct ConnectConfig {
    pub(crate) location: String,
    pub(crate) port: Option<u16>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) database: Option<String>,
    pub(crate) flags: Flags,
    pub(crate) options: Vec<DriverOption>,
}

impl ConnectConfig {
    /// Start a configuration for the given file path, host name, or address.
    pub fn new(location: impl Into<String>) -> Self {
        ConnectConfig {
            location: location.into(),
            ..ConnectConfig::default()
        }
    }

    /// Server port to connect to.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Username to authenticate with.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Password corresponding to the username.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Database to select after connecting.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Connection open flags.
    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Append a driver-specific option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(DriverOption {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub(crate) fn parse_timeout_secs(value: &str) -> Result<u32, DbalError> {
        value.trim().parse::<u32>().map_err(|_| {
            DbalError::Param(format!("CONNECT_TIMEOUT value {value:?} is not a valid second count"))
        })
    }
}
