//! Bounded sleep-and-retry loop for transient lock contention.
//!
//! SQLite reports `SQLITE_BUSY` when another process holds a file lock; the
//! adapter retries the operation a fixed number of times with a fixed pause
//! between attempts. This is a cooperative wait, not a concurrency
//! primitive; exhausting the budget surfaces the underlying error.

use std::thread;
use std::time::Duration;

/// Maximum number of retries when the engine reports a busy condition.
pub(crate) const MAX_BUSY_RETRIES: u32 = 10;

/// Pause between busy retries.
pub(crate) const BUSY_SLEEP: Duration = Duration::from_millis(10);

/// Run `op`, retrying while `is_busy` classifies the error as transient.
///
/// The first attempt does not count against the retry budget, matching a
/// loop that retries up to `MAX_BUSY_RETRIES` times after an initial
/// failure. Non-busy errors propagate immediately.
pub(crate) fn with_busy_retry<T, E>(
    mut op: impl FnMut() -> Result<T, E>,
    is_busy: impl Fn(&E) -> bool,
) -> Result<T, E> {
    let mut retries = 0u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if is_busy(&err) && retries < MAX_BUSY_RETRIES => {
                retries += 1;
                thread::sleep(BUSY_SLEEP);
            }
            Err(err) => return Err(err),
        }
    }
}
