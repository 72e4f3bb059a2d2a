//! Bounded retry with a fixed delay
//!
//! Operations are attempted up to `max_attempts` times (the first call
//! included). Between attempts the caller sleeps exactly `delay`; the delay
//! never grows. Errors decide for themselves whether another attempt is
//! worthwhile through [`Retryable`].
//!
//! # Example
//!
//! ```rust
//! use inat_core::clock::SystemClock;
//! use inat_core::retry::{retry, Retryable, RetryPolicy};
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("flaky")
//!     }
//! }
//!
//! impl Retryable for Flaky {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let policy = RetryPolicy::new(3, std::time::Duration::ZERO);
//! let value = retry(&policy, &SystemClock, |attempt| {
//!     if attempt < 2 { Err(Flaky) } else { Ok(attempt) }
//! });
//! assert_eq!(value.unwrap(), 2);
//! ```

use crate::clock::Clock;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that know whether repeating the operation could help
pub trait Retryable {
    /// True when another attempt may succeed
    fn is_retryable(&self) -> bool;
}

/// Retry policy: attempt budget and fixed delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: fmt::Display + fmt::Debug,
{
    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Most recent failure
        last: E,
    },

    /// A non-retryable error ended the operation early
    #[error("{0}")]
    Fatal(E),
}

impl<E> RetryError<E>
where
    E: fmt::Display + fmt::Debug,
{
    /// Number of attempts made before giving up, when exhausted
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            Self::Fatal(_) => None,
        }
    }

    /// The underlying error
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } | Self::Fatal(last) => last,
        }
    }
}

/// Run `op` under `policy`, sleeping on `clock` between attempts
///
/// `op` receives the 1-based attempt number.
pub fn retry<T, E, F>(policy: &RetryPolicy, clock: &dyn Clock, mut op: F) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Result<T, E>,
    E: Retryable + fmt::Display + fmt::Debug,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt) {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if !error.is_retryable() => {
                return Err(RetryError::Fatal(error));
            }
            Err(error) if attempt >= max_attempts => {
                warn!(attempts = attempt, error = %error, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }
            Err(error) => {
                debug!(
                    attempt,
                    max_attempts,
                    delay_ms = u64::try_from(policy.delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "Attempt failed, retrying"
                );
                clock.sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}
