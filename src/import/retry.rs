//! Retry classification for batch writes.
//!
//! The default policy never retries: a failed batch is rolled back, logged
//! and skipped. With `max_retries > 0`, transient failures (dropped
//! connections, serialization failures, deadlocks) are retried with
//! exponential backoff; permanent failures are still skipped immediately.

use std::time::Duration;

/// How a failed database operation should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The connection itself is gone; reconnect before retrying.
    Connection,
    /// The statement may succeed if simply run again.
    Transient,
    /// Retrying cannot help (constraint violation, bad data, ...).
    Permanent,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::Permanent)
    }
}

/// Classify an sqlx error by its SQLSTATE class.
pub fn classify(err: &sqlx::Error) -> FailureKind {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            FailureKind::Connection
        }
        sqlx::Error::PoolTimedOut => FailureKind::Transient,
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => classify_sqlstate(&code),
            None => FailureKind::Permanent,
        },
        _ => FailureKind::Permanent,
    }
}

fn classify_sqlstate(code: &str) -> FailureKind {
    match code {
        // connection exception class, admin/crash shutdown
        c if c.starts_with("08") => FailureKind::Connection,
        "57P01" | "57P02" | "57P03" => FailureKind::Connection,
        // serialization_failure, deadlock_detected, lock_not_available
        "40001" | "40P01" | "55P03" => FailureKind::Transient,
        _ => FailureKind::Permanent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    const MAX_DELAY: Duration = Duration::from_secs(30);

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1),
    /// capped at 30s.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(Self::MAX_DELAY)
            .min(Self::MAX_DELAY)
    }

    /// Whether a failure on retry number `attempt` (0 = first try) should be
    /// attempted again.
    pub fn should_retry(&self, kind: FailureKind, attempt: u32) -> bool {
        kind.is_retryable() && attempt < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_classes() {
        assert_eq!(classify_sqlstate("08006"), FailureKind::Connection);
        assert_eq!(classify_sqlstate("57P01"), FailureKind::Connection);
        assert_eq!(classify_sqlstate("40001"), FailureKind::Transient);
        assert_eq!(classify_sqlstate("40P01"), FailureKind::Transient);
        // unique_violation, cardinality_violation, not_null_violation
        assert_eq!(classify_sqlstate("23505"), FailureKind::Permanent);
        assert_eq!(classify_sqlstate("21000"), FailureKind::Permanent);
        assert_eq!(classify_sqlstate("23502"), FailureKind::Permanent);
    }

    #[test]
    fn io_errors_are_connection_failures() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset by peer",
        ));
        assert_eq!(classify(&err), FailureKind::Connection);
        assert_eq!(classify(&sqlx::Error::RowNotFound), FailureKind::Permanent);
    }

    #[test]
    fn default_policy_never_retries() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(FailureKind::Transient, 0));
        assert!(!policy.should_retry(FailureKind::Connection, 0));
    }

    #[test]
    fn permanent_failures_are_never_retried() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(10),
        };
        assert!(!policy.should_retry(FailureKind::Permanent, 0));
        assert!(policy.should_retry(FailureKind::Transient, 4));
        assert!(!policy.should_retry(FailureKind::Transient, 5));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(20), Duration::from_secs(30));
    }
}
