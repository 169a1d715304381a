//! Retry wrapper for writes that contend with concurrent batch edits.

use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Run `f`, retrying transient lock conflicts with linear backoff.
///
/// Attempt `n` that fails with a transient error sleeps `base_delay * n`
/// before the next attempt. Any other error, or the last transient one, is
/// returned as is.
pub fn with_retry<T, F>(label: &str, policy: RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(
                    "{}: transient conflict on attempt {}/{}: {}",
                    label,
                    attempt,
                    attempts,
                    e
                );
                std::thread::sleep(policy.base_delay * attempt);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
