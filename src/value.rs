//! Engine-neutral value representation and column coercion.
//!
//! Every driver adapter materializes parameters and result cells into
//! [`Value`], so the coercion rules for reading a column as blob, text, or
//! int64 live in one place. Coercion happens on demand at read time, never
//! eagerly at fetch time.

use crate::error::DbalError;

/// A parameter or result cell in engine-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float. Produced only by drivers; there is no float bind.
    Float(f64),
    /// Text string.
    Text(String),
    /// Binary data.
    Blob(Vec<u8>),
    /// SQL NULL.
    Null,
}

/// Column data type in the result set of a prepared statement.
///
/// The PostgreSQL and MariaDB adapters treat non-null scalars as opaque byte
/// sequences and therefore only ever report [`ColumnType::Blob`] or
/// [`ColumnType::Null`]; applications can still rely on the null check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Integer.
    Int,
    /// Text string.
    Text,
    /// Blob/binary data.
    Blob,
    /// NULL value.
    Null,
    /// Non-standard data type.
    Other,
}

impl Value {
    /// True if this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerce to text. NULL yields `None`, never an error.
    pub(crate) fn to_text(&self) -> Result<Option<String>, DbalError> {
        match self {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            Value::Int(i) => Ok(Some(i.to_string())),
            Value::Float(f) => Ok(Some(f.to_string())),
            Value::Blob(b) => String::from_utf8(b.clone()).map(Some).map_err(|_| {
                DbalError::ColumnCoerce("blob column holds invalid UTF-8".to_string())
            }),
        }
    }

    /// Coerce to binary. NULL yields `None`, never an error.
    pub(crate) fn to_blob(&self) -> Result<Option<Vec<u8>>, DbalError> {
        match self {
            Value::Null => Ok(None),
            Value::Blob(b) => Ok(Some(b.clone())),
            Value::Text(s) => Ok(Some(s.as_bytes().to_vec())),
            Value::Int(i) => Ok(Some(i.to_string().into_bytes())),
            Value::Float(f) => Ok(Some(f.to_string().into_bytes())),
        }
    }

    /// Coerce to a 64-bit integer. NULL yields `None`, never an error.
    ///
    /// Textual values must parse as a complete, in-range base-10 integer;
    /// anything else is a coercion failure.
    pub(crate) fn to_int64(&self) -> Result<Option<i64>, DbalError> {
        match self {
            Value::Null => Ok(None),
            Value::Int(i) => Ok(Some(*i)),
            Value::Float(f) => {
                let truncated = f.trunc();
                if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                    Ok(Some(truncated as i64))
                } else {
                    Err(DbalError::ColumnCoerce(format!(
                        "float {f} out of i64 range"
                    )))
                }
            }
            Value::Text(s) => parse_int64(s).map(Some),
            Value::Blob(b) => {
                let s = std::str::from_utf8(b).map_err(|_| {
                    DbalError::ColumnCoerce("blob column holds invalid UTF-8".to_string())
                })?;
                parse_int64(s).map(Some)
            }
        }
    }
}

/// Parse a complete base-10 64-bit integer.
///
/// Leading/trailing whitespace is accepted; anything else that `strtoll`
/// would stop at (trailing garbage, empty string, out-of-range magnitude)
/// is a coercion failure.
pub(crate) fn parse_int64(text: &str) -> Result<i64, DbalError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DbalError::ColumnCoerce(
            "cannot parse empty string as integer".to_string(),
        ));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| DbalError::ColumnCoerce(format!("cannot parse {text:?} as 64-bit integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reads_yield_none_without_error() {
        assert_eq!(Value::Null.to_text().unwrap(), None);
        assert_eq!(Value::Null.to_blob().unwrap(), None);
        assert_eq!(Value::Null.to_int64().unwrap(), None);
    }

    #[test]
    fn int_round_trip_and_text_rendering() {
        let v = Value::Int(-42);
        assert_eq!(v.to_int64().unwrap(), Some(-42));
        assert_eq!(v.to_text().unwrap().as_deref(), Some("-42"));
        assert_eq!(v.to_blob().unwrap().as_deref(), Some(b"-42".as_slice()));
    }

    #[test]
    fn text_parses_as_integer_when_well_formed() {
        assert_eq!(
            Value::Text("123".into()).to_int64().unwrap(),
            Some(123)
        );
        assert_eq!(
            Value::Text(i64::MIN.to_string()).to_int64().unwrap(),
            Some(i64::MIN)
        );
    }

    #[test]
    fn malformed_text_is_a_coercion_failure() {
        assert!(Value::Text("12abc".into()).to_int64().is_err());
        assert!(Value::Text("".into()).to_int64().is_err());
        assert!(Value::Text("1.5".into()).to_int64().is_err());
        // One past i64::MAX.
        assert!(Value::Text("9223372036854775808".into()).to_int64().is_err());
    }

    #[test]
    fn blob_text_coercions_share_bytes() {
        let v = Value::Blob(b"hello".to_vec());
        assert_eq!(v.to_text().unwrap().as_deref(), Some("hello"));
        let v = Value::Text("hello".into());
        assert_eq!(v.to_blob().unwrap().as_deref(), Some(b"hello".as_slice()));
    }

    #[test]
    fn invalid_utf8_blob_does_not_read_as_text() {
        let v = Value::Blob(vec![0xff, 0xfe]);
        assert!(v.to_text().is_err());
        assert!(v.to_int64().is_err());
        assert_eq!(v.to_blob().unwrap().unwrap(), vec![0xff, 0xfe]);
    }
}
