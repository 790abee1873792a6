use thiserror::Error;

/// Status codes reported after every library operation.
///
/// The set is closed and totally ordered; every failing operation maps onto
/// exactly one of these. Use [`crate::Connection::error_string`] for a
/// human-readable description of the most recent failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum Status {
    /// Successful operation.
    Ok = 0,
    /// Invalid parameter.
    Param,
    /// Memory allocation failed.
    Nomem,
    /// Overflow, wrap, or conversion issue.
    Overflow,
    /// Failed to execute SQL statement.
    Exec,
    /// Failed to prepare statement.
    Prepare,
    /// Failed to bind parameter.
    Bind,
    /// Failed to fetch the next result row.
    Fetch,
    /// Error coercing the requested column value.
    ColumnCoerce,
    /// Driver not supported or not compiled into this build.
    DriverNoSupport,
    /// Failed to open the database handle or connection.
    Open,
    /// Failed to close or free database resources.
    Close,
}

impl Status {
    /// Map a raw numeric code back onto a status.
    ///
    /// Out-of-range codes clamp to [`Status::Param`] so an invalid value can
    /// never persist as a status.
    pub fn from_code(code: u32) -> Status {
        match code {
            0 => Status::Ok,
            1 => Status::Param,
            2 => Status::Nomem,
            3 => Status::Overflow,
            4 => Status::Exec,
            5 => Status::Prepare,
            6 => Status::Bind,
            7 => Status::Fetch,
            8 => Status::ColumnCoerce,
            9 => Status::DriverNoSupport,
            10 => Status::Open,
            11 => Status::Close,
            _ => Status::Param,
        }
    }

    /// Fixed human-readable description for this status code.
    pub fn message(self) -> &'static str {
        match self {
            Status::Ok => "Success",
            Status::Param => "Invalid parameter",
            Status::Nomem => "Memory allocation failed",
            Status::Overflow => "Overflow/wrap/conversion",
            Status::Exec => "Failed to execute SQL statement",
            Status::Prepare => "Failed to prepare statement",
            Status::Bind => "Failed to bind parameter",
            Status::Fetch => "Failed to fetch next statement result",
            Status::ColumnCoerce => "Error coercing the requested column value",
            Status::DriverNoSupport => "Driver not supported",
            Status::Open => "Failed to open database context",
            Status::Close => "Failed to close database context",
        }
    }
}

/// Error type returned by every fallible operation in this crate.
///
/// Each variant corresponds to one failing [`Status`] code; the payload
/// carries the driver-supplied or library-generated detail message.
#[derive(Debug, Error)]
pub enum DbalError {
    #[error("invalid parameter: {0}")]
    Param(String),

    #[error("memory allocation failed: {0}")]
    Nomem(String),

    #[error("overflow/wrap/conversion: {0}")]
    Overflow(String),

    #[error("failed to execute SQL statement: {0}")]
    Exec(String),

    #[error("failed to prepare statement: {0}")]
    Prepare(String),

    #[error("failed to bind parameter: {0}")]
    Bind(String),

    #[error("failed to fetch next statement result: {0}")]
    Fetch(String),

    #[error("error coercing the requested column value: {0}")]
    ColumnCoerce(String),

    #[error("driver not supported: {0}")]
    DriverNoSupport(String),

    #[error("failed to open database context: {0}")]
    Open(String),

    #[error("failed to close database context: {0}")]
    Close(String),
}

impl DbalError {
    /// The status code this error maps onto.
    pub fn status(&self) -> Status {
        match self {
            DbalError::Param(_) => Status::Param,
            DbalError::Nomem(_) => Status::Nomem,
            DbalError::Overflow(_) => Status::Overflow,
            DbalError::Exec(_) => Status::Exec,
            DbalError::Prepare(_) => Status::Prepare,
            DbalError::Bind(_) => Status::Bind,
            DbalError::Fetch(_) => Status::Fetch,
            DbalError::ColumnCoerce(_) => Status::ColumnCoerce,
            DbalError::DriverNoSupport(_) => Status::DriverNoSupport,
            DbalError::Open(_) => Status::Open,
            DbalError::Close(_) => Status::Close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_round_trips_valid_codes() {
        for code in 0..=11u32 {
            let status = Status::from_code(code);
            assert_eq!(status as u32, code);
        }
    }

    #[test]
    fn from_code_clamps_out_of_range_to_param() {
        assert_eq!(Status::from_code(12), Status::Param);
        assert_eq!(Status::from_code(u32::MAX), Status::Param);
    }

    #[test]
    fn fixed_messages_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for code in 0..=11u32 {
            assert!(seen.insert(Status::from_code(code).message()));
        }
    }

    #[test]
    fn error_maps_to_matching_status() {
        assert_eq!(DbalError::Bind("x".into()).status(), Status::Bind);
        assert_eq!(
            DbalError::DriverNoSupport("x".into()).status(),
            Status::DriverNoSupport
        );
        assert_eq!(DbalError::Overflow("x".into()).status(), Status::Overflow);
    }
}
