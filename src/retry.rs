//! Bounded retry with linear backoff.

use std::thread;
use std::time::Duration;

/// Run `op` until it returns exit status 0 or `max_attempts` attempts have
/// been made, sleeping `(attempt - 1) * 2` seconds before each retry
/// (0s, 2s, 4s, ...). `max_attempts == 0` means a single attempt with no
/// retries. Returns `Err` with the last failing status when the budget is
/// exhausted. Attempts are strictly sequential.
pub fn retry<F>(max_attempts: u32, op: F) -> std::result::Result<(), i32>
where
    F: FnMut() -> i32,
{
    retry_with(max_attempts, op, thread::sleep)
}

/// [`retry`] with an injectable sleeper, so backoff timing is observable
/// in tests without actually sleeping.
pub fn retry_with<F, S>(max_attempts: u32, mut op: F, mut sleep: S) -> std::result::Result<(), i32>
where
    F: FnMut() -> i32,
    S: FnMut(Duration),
{
    let mut attempt: u32 = 1;
    loop {
        let status = op();
        if status == 0 {
            return Ok(());
        }
        if max_attempts == 0 || attempt >= max_attempts {
            return Err(status);
        }
        sleep(Duration::from_secs(u64::from(attempt - 1) * 2));
        attempt += 1;
    }
}
