//! Fixed-count retry without backoff.

use std::fmt::Display;

/// Attempts used for catalog lookups.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Run `op` up to `attempts` times.
///
/// The first `attempts - 1` calls are guarded: a failure is logged and the
/// operation is invoked again straight away. The last call is unguarded and
/// whatever it returns is handed back untouched, so callers see the error of
/// the final attempt itself rather than a wrapper. `op` receives the 1-based
/// attempt number. An `attempts` of 0 behaves like 1.
pub fn retry<T, E, F>(attempts: u32, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let attempts = attempts.max(1);
    for attempt in 1..attempts {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
            }
        }
    }
    op(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Boom(u32);

    impl Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom #{}", self.0)
        }
    }

    #[test]
    fn test_first_success_calls_once() {
        let calls = Cell::new(0);
        let result: Result<&str, Boom> = retry(5, |_| {
            calls.set(calls.get() + 1);
            Ok("done")
        });
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_recovers_after_failures() {
        let calls = Cell::new(0);
        let result = retry(5, |attempt| {
            calls.set(calls.get() + 1);
            if attempt < 3 { Err(Boom(attempt)) } else { Ok(attempt) }
        });
        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_last_attempt_error_propagates() {
        let calls = Cell::new(0);
        let result: Result<(), Boom> = retry(DEFAULT_ATTEMPTS, |attempt| {
            calls.set(calls.get() + 1);
            Err(Boom(attempt))
        });
        assert_eq!(result, Err(Boom(5)));
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let result: Result<(), Boom> = retry(0, |attempt| {
            calls.set(calls.get() + 1);
            Err(Boom(attempt))
        });
        assert_eq!(result, Err(Boom(1)));
        assert_eq!(calls.get(), 1);
    }
}
