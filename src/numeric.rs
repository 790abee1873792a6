//! Overflow-checked arithmetic and integer narrowing.
//!
//! Every conversion between the integer widths used across the API goes
//! through one of these functions instead of `as` casts. Each function is
//! pure: it either produces the converted value or reports
//! [`DbalError::Overflow`], and a failure aborts only the operation that
//! requested the conversion.

use crate::error::DbalError;

fn overflow(detail: &str) -> DbalError {
    DbalError::Overflow(detail.to_string())
}

/// Add two size counters, rejecting wrap-around.
pub fn checked_add(a: usize, b: usize) -> Result<usize, DbalError> {
    a.checked_add(b)
        .ok_or_else(|| overflow("usize addition wrapped"))
}

/// Multiply two size counters, rejecting wrap-around.
///
/// Used for multiply-then-allocate sizing; a product that would wrap is
/// rejected before any allocation happens.
pub fn checked_mul(a: usize, b: usize) -> Result<usize, DbalError> {
    a.checked_mul(b)
        .ok_or_else(|| overflow("usize multiplication wrapped"))
}

/// Narrow a size counter to `u32`.
pub fn usize_to_u32(value: usize) -> Result<u32, DbalError> {
    u32::try_from(value).map_err(|_| overflow("usize does not fit in u32"))
}

/// Narrow a size counter to `i32`.
pub fn usize_to_i32(value: usize) -> Result<i32, DbalError> {
    i32::try_from(value).map_err(|_| overflow("usize does not fit in i32"))
}

/// Widen a signed 32-bit value to a size counter, rejecting negatives.
pub fn i32_to_usize(value: i32) -> Result<usize, DbalError> {
    usize::try_from(value).map_err(|_| overflow("negative i32 is not a valid size"))
}

/// Widen an unsigned 32-bit value to a size counter.
pub fn u32_to_usize(value: u32) -> Result<usize, DbalError> {
    usize::try_from(value).map_err(|_| overflow("u32 does not fit in usize"))
}

/// Reinterpret a signed 64-bit value as unsigned, rejecting negatives.
pub fn i64_to_u64(value: i64) -> Result<u64, DbalError> {
    u64::try_from(value).map_err(|_| overflow("negative i64 is not a valid u64"))
}

/// Reinterpret an unsigned 64-bit value as signed, rejecting the upper half.
pub fn u64_to_i64(value: u64) -> Result<i64, DbalError> {
    i64::try_from(value).map_err(|_| overflow("u64 does not fit in i64"))
}

/// Narrow a signed 64-bit value to a size counter.
pub fn i64_to_usize(value: i64) -> Result<usize, DbalError> {
    usize::try_from(value).map_err(|_| overflow("i64 does not fit in usize"))
}

/// Narrow an unsigned 64-bit value to a size counter.
pub fn u64_to_usize(value: u64) -> Result<usize, DbalError> {
    usize::try_from(value).map_err(|_| overflow("u64 does not fit in usize"))
}
