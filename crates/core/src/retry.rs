//! Resilient operation executor
//!
//! Wraps any fallible startup I/O in a bounded retry loop. The policy
//! decides which failures are worth another attempt; everything else is
//! terminal on first sight.

use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};
use crate::logbook::LogContext;

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    None,
    Fixed(Duration),
    /// `initial * factor^n`, capped at `max`, plus up to `jitter`
    Exponential {
        initial: Duration,
        factor: u32,
        max: Duration,
        jitter: Duration,
    },
}

/// Retry policy for one kind of operation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Upper bound on invocations; zero is treated as one
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Classifier deciding whether a failure may be retried
    pub retryable: fn(&Error) -> bool,
}

impl RetryPolicy {
    /// Policy for file-system reads and writes during startup
    pub fn file_operation() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(100),
                factor: 2,
                max: Duration::from_secs(1),
                jitter: Duration::from_millis(50),
            },
            retryable: Error::is_transient,
        }
    }

    /// Same classifier, no waiting (tests and interactive paths)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::None,
            retryable: Error::is_transient,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Map the result of attempt number `attempt` (1-based) to an outcome
    pub fn classify<T>(&self, attempt: u32, result: Result<T>) -> Outcome<T> {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(e) if (self.retryable)(&e) && attempt < self.attempts() => {
                Outcome::RetryableFailure(e)
            }
            Err(e) => Outcome::TerminalFailure(e),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                factor,
                max,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(16);
                let base = initial
                    .saturating_mul(factor.saturating_pow(exponent))
                    .min(max);
                let jitter_ms = jitter.as_millis() as u64;
                if jitter_ms == 0 {
                    base
                } else {
                    base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
                }
            }
        }
    }
}

/// Result of one attempt
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    RetryableFailure(Error),
    TerminalFailure(Error),
}

/// Run `op` under `policy`
///
/// Each failed attempt is logged with its index and cause. A terminal
/// cause or exhaustion yields [`Error::OperationFailed`].
pub fn execute<T, F>(policy: &RetryPolicy, log: &LogContext, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max = policy.attempts();
    let mut attempt = 1;
    loop {
        match policy.classify(attempt, op()) {
            Outcome::Success(value) => {
                if attempt > 1 {
                    tracing::debug!(operation, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Outcome::RetryableFailure(e) => {
                log.warning(
                    "Operation Retry",
                    &format!("{operation}: attempt {attempt}/{max} failed: {e}"),
                );
                let delay = policy.delay_after(attempt);
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Outcome::TerminalFailure(e) => {
                log.warning(
                    "Operation Retry",
                    &format!("{operation}: attempt {attempt}/{max} failed: {e}"),
                );
                return Err(Error::OperationFailed {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
        }
    }
}

/// Combinator form of [`execute`]: wrap `op` once, call it many times
pub fn with_retry<'a, T, F>(
    policy: &'a RetryPolicy,
    log: &'a LogContext,
    operation: &'a str,
    mut op: F,
) -> impl FnMut() -> Result<T> + 'a
where
    T: 'a,
    F: FnMut() -> Result<T> + 'a,
{
    move || execute(policy, log, operation, &mut op)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;
    use std::sync::Arc;

    use super::*;
    use crate::logbook::{Level, MemorySink};

    fn context() -> (Arc<MemorySink>, LogContext) {
        let sink = Arc::new(MemorySink::new());
        let ctx = LogContext::new(sink.clone(), "tester");
        (sink, ctx)
    }

    fn transient() -> Error {
        Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "file locked"))
    }

    #[test]
    fn success_on_first_attempt() {
        let (sink, ctx) = context();
        let calls = Cell::new(0);

        let value = execute(&RetryPolicy::immediate(3), &ctx, "read", || {
            calls.set(calls.get() + 1);
            Ok(7)
        })
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.get(), 1);
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn retries_transient_failures_until_success() {
        let (sink, ctx) = context();
        let calls = Cell::new(0);

        let value = execute(&RetryPolicy::immediate(3), &ctx, "read", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(transient())
            } else {
                Ok("done")
            }
        })
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(calls.get(), 3);
        assert_eq!(sink.count_level(Level::Warning), 2);
        assert!(sink.entries()[0].message.contains("attempt 1/3"));
    }

    #[test]
    fn never_exceeds_max_attempts() {
        let (_sink, ctx) = context();
        let calls = Cell::new(0);

        let result: Result<()> = execute(&RetryPolicy::immediate(4), &ctx, "write", || {
            calls.set(calls.get() + 1);
            Err(transient())
        });

        assert_eq!(calls.get(), 4);
        match result {
            Err(Error::OperationFailed { attempts, .. }) => assert_eq!(attempts, 4),
            other => panic!("expected OperationFailed, got {:?}", other),
        }
    }

    #[test]
    fn terminal_failure_is_not_retried() {
        let (sink, ctx) = context();
        let calls = Cell::new(0);

        let result: Result<()> = execute(&RetryPolicy::immediate(5), &ctx, "load", || {
            calls.set(calls.get() + 1);
            Err(Error::Io(io::Error::new(io::ErrorKind::NotFound, "missing")))
        });

        assert_eq!(calls.get(), 1);
        let err = result.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(sink.entries().len(), 1);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let (_sink, ctx) = context();
        let calls = Cell::new(0);

        let _ = execute(&RetryPolicy::immediate(0), &ctx, "read settings", || {
            calls.set(calls.get() + 1);
            Err::<(), _>(transient())
        });

        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn combinator_wraps_operation() {
        let (_sink, ctx) = context();
        let calls = Cell::new(0);

        let policy = RetryPolicy::immediate(2);
        let mut wrapped = with_retry(&policy, &ctx, "flaky", || {
            calls.set(calls.get() + 1);
            if calls.get() % 2 == 1 {
                Err(transient())
            } else {
                Ok(calls.get())
            }
        });

        assert_eq!(wrapped().unwrap(), 2);
        assert_eq!(wrapped().unwrap(), 4);
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(100),
                factor: 2,
                max: Duration::from_millis(500),
                jitter: Duration::ZERO,
            },
            retryable: Error::is_transient,
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
        assert_eq!(policy.delay_after(9), Duration::from_millis(500));
    }
}
