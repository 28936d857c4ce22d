//! Retry policies for the two layers of the client.
//!
//! [`TransportRetryPolicy`] decides how often and how long the transport waits
//! between attempts at a single HTTP exchange that failed for infrastructure
//! reasons. [`RateLimitRetryPolicy`] drives the session client's own loop,
//! which only reacts to the broker answering 429. The two are configured and
//! tested independently.

use http::StatusCode;
use std::time::Duration;

/// The outcome of one transport attempt, as seen by a [`TransientPredicate`].
#[derive(Debug, Clone, Copy)]
pub enum Attempt<'a> {
    /// The exchange failed before a response arrived.
    Failed(&'a reqwest::Error),
    /// A response arrived with this status.
    Completed(StatusCode),
}

/// Decides whether a transport attempt failed in a way worth retrying.
///
/// # Examples
///
/// ```
/// use semp_client::retry::{Attempt, TransientPredicate};
/// use http::StatusCode;
///
/// struct RetryOnServiceUnavailable;
///
/// impl TransientPredicate for RetryOnServiceUnavailable {
///     fn is_transient(&self, attempt: &Attempt<'_>) -> bool {
///         matches!(attempt, Attempt::Completed(StatusCode::SERVICE_UNAVAILABLE))
///     }
/// }
/// ```
pub trait TransientPredicate: Send + Sync {
    /// Returns `true` if the attempt should be repeated.
    fn is_transient(&self, attempt: &Attempt<'_>) -> bool;
}

/// Retries connection-level failures and 502, 503 and 504 responses.
///
/// Timeouts are not retried: the request already used up its deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOnTransient;

impl TransientPredicate for RetryOnTransient {
    fn is_transient(&self, attempt: &Attempt<'_>) -> bool {
        match attempt {
            Attempt::Failed(error) => !error.is_timeout() && !error.is_builder(),
            Attempt::Completed(status) => matches!(
                *status,
                StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
        }
    }
}

/// Backoff for the transport layer: `base_delay * 2^attempt`, attempt
/// counted from 0, for at most `max_retries` retries after the first try.
///
/// ```
/// use semp_client::retry::TransportRetryPolicy;
/// use std::time::Duration;
///
/// let policy = TransportRetryPolicy::default();
/// assert_eq!(policy.delay_for_retry(0), Some(Duration::from_secs(1)));
/// assert_eq!(policy.delay_for_retry(3), Some(Duration::from_secs(8)));
/// assert_eq!(policy.delay_for_retry(6), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl TransportRetryPolicy {
    /// Default retry ceiling of the transport.
    pub const DEFAULT_MAX_RETRIES: u32 = 6;

    /// Creates a policy with the given ceiling and base delay.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns the wait before retry number `retry` (0-indexed), or `None`
    /// once the ceiling is reached.
    pub fn delay_for_retry(&self, retry: u32) -> Option<Duration> {
        if retry >= self.max_retries {
            return None;
        }
        let multiplier = 2u32.saturating_pow(retry);
        Some(self.base_delay.saturating_mul(multiplier))
    }
}

impl Default for TransportRetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Duration::from_secs(1))
    }
}

/// Backoff for the session client's 429 loop.
///
/// The client makes at most `retries + 1` attempts. The wait starts at
/// `min_interval` and doubles after every rate-limited attempt, capped at
/// `max_interval`.
///
/// ```
/// use semp_client::retry::RateLimitRetryPolicy;
/// use std::time::Duration;
///
/// let policy = RateLimitRetryPolicy::new(4, Duration::from_secs(1), Duration::from_secs(3));
/// let waits: Vec<_> = policy.waits().collect();
/// assert_eq!(
///     waits,
///     vec![
///         Duration::from_secs(1),
///         Duration::from_secs(2),
///         Duration::from_secs(3),
///         Duration::from_secs(3),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRetryPolicy {
    /// Extra attempts beyond the first.
    pub retries: u32,
    /// First wait after a 429.
    pub min_interval: Duration,
    /// Upper bound for the wait.
    pub max_interval: Duration,
}

impl RateLimitRetryPolicy {
    /// Creates a policy.
    pub fn new(retries: u32, min_interval: Duration, max_interval: Duration) -> Self {
        Self {
            retries,
            min_interval,
            max_interval,
        }
    }

    /// Total attempts the client may make.
    pub fn max_attempts(&self) -> usize {
        self.retries as usize + 1
    }

    /// The wait that follows `current`.
    pub fn next_wait(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }

    /// The sequence of waits between attempts; one entry per retry.
    pub fn waits(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.min_interval), move |wait| {
            Some(self.next_wait(*wait))
        })
        .take(self.retries as usize)
    }
}

impl Default for RateLimitRetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }
}
