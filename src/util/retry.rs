//! Fixed-attempt retry helper.
//!
//! The transcode engine retries its filesystem steps a fixed number of times
//! with a short pause between attempts. All call sites share this one helper
//! instead of hand-rolling the loop.

use std::time::Duration;

/// Number of attempts the transcode engine gives each filesystem step.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Pause between attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(150);

/// Runs `op` up to `attempts` times, sleeping `delay` between failures.
///
/// Returns the first success, or the last error once attempts are exhausted.
/// Each failed attempt is logged at debug level.
pub fn retry_fixed<T, E, F>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::debug!("Attempt {attempt}/{attempts} failed: {e}. Retrying.");
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!("Attempt {attempt}/{attempts} failed: {e}. Giving up.");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeds_first_try() {
        let mut calls = 0;
        let result: Result<u32, &str> = retry_fixed(3, Duration::ZERO, || {
            calls += 1;
            Ok(42)
        });
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_recovers_on_third_attempt() {
        let mut calls = 0;
        let result: Result<u32, &str> = retry_fixed(3, Duration::ZERO, || {
            calls += 1;
            if calls < 3 {
                Err("transient")
            } else {
                Ok(7)
            }
        });
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausts_attempts() {
        let mut calls = 0;
        let result: Result<u32, &str> = retry_fixed(3, Duration::ZERO, || {
            calls += 1;
            Err("still broken")
        });
        assert_eq!(result, Err("still broken"));
        assert_eq!(calls, 3);
    }
}
