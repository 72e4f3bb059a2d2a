//! Minimum-interval rate limiting for outbound API calls
//!
//! The iNaturalist API asks clients to stay at or below roughly one request
//! per second. [`IntervalLimiter`] enforces a minimum gap between granted
//! requests on a single client instance:
//! - The first call is granted immediately
//! - Later calls block until `1 / rate` seconds have passed since the last grant
//! - Concurrent callers serialize on an internal lock
//!
//! # Example
//!
//! ```rust
//! use inat_core::rate_limit::IntervalLimiter;
//!
//! let limiter = IntervalLimiter::new(2.0);
//! limiter.acquire(); // immediate
//! limiter.acquire(); // waits ~500ms
//! ```

use crate::clock::{Clock, SystemClock};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Convert a requests-per-second rate into the minimum gap between requests
///
/// Returns `None` for zero, negative or non-finite rates.
#[must_use]
pub fn interval_for_rate(rate_per_second: f64) -> Option<Duration> {
    if !rate_per_second.is_finite() || rate_per_second <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rate_per_second).ok()
}

/// Blocking limiter that enforces a minimum interval between grants
pub struct IntervalLimiter {
    min_interval: Duration,
    last_granted: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl IntervalLimiter {
    /// Create a limiter on the system clock
    ///
    /// Rates that [`interval_for_rate`] rejects disable limiting; callers
    /// validate the rate before construction.
    #[must_use]
    pub fn new(rate_per_second: f64) -> Self {
        Self::with_clock(rate_per_second, Arc::new(SystemClock))
    }

    /// Create a limiter on a caller-supplied clock
    #[must_use]
    pub fn with_clock(rate_per_second: f64, clock: Arc<dyn Clock>) -> Self {
        let min_interval = interval_for_rate(rate_per_second).unwrap_or(Duration::ZERO);
        Self::from_interval(min_interval, clock)
    }

    /// Create a limiter from an explicit minimum interval
    #[must_use]
    pub fn from_interval(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_granted: Mutex::new(None),
            clock,
        }
    }

    /// Block until a request may be issued, then record the grant
    ///
    /// Returns how long the caller was held back.
    pub fn acquire(&self) -> Duration {
        // Held across the sleep so the check-and-record is atomic.
        let mut last = self
            .last_granted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                debug!(
                    wait_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    "Rate limiter delaying request"
                );
                self.clock.sleep(waited);
            }
        }

        *last = Some(self.clock.now());
        waited
    }

    /// Time a call to [`acquire`](Self::acquire) would currently wait
    #[must_use]
    pub fn time_until_ready(&self) -> Duration {
        let last = self
            .last_granted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match *last {
            Some(previous) => {
                let elapsed = self.clock.now().saturating_duration_since(previous);
                self.min_interval.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// Minimum gap enforced between grants
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl std::fmt::Debug for IntervalLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalLimiter")
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    fn manual_limiter(rate: f64) -> (IntervalLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = IntervalLimiter::with_clock(rate, clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_interval_for_rate() {
        assert_eq!(interval_for_rate(1.0), Some(Duration::from_secs(1)));
        assert_eq!(interval_for_rate(4.0), Some(Duration::from_millis(250)));
        assert_eq!(interval_for_rate(0.0), None);
        assert_eq!(interval_for_rate(-2.0), None);
        assert_eq!(interval_for_rate(f64::NAN), None);
    }

    #[test]
    fn test_first_acquire_is_immediate() {
        let (limiter, clock) = manual_limiter(1.0);

        assert_eq!(limiter.acquire(), Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_back_to_back_acquire_waits_full_interval() {
        let (limiter, clock) = manual_limiter(2.0);

        limiter.acquire();
        let waited = limiter.acquire();

        assert_eq!(waited, Duration::from_millis(500));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn test_partial_elapsed_waits_remainder() {
        let (limiter, clock) = manual_limiter(1.0);

        limiter.acquire();
        clock.advance(Duration::from_millis(700));

        assert_eq!(limiter.time_until_ready(), Duration::from_millis(300));
        assert_eq!(limiter.acquire(), Duration::from_millis(300));
    }

    #[test]
    fn test_no_wait_after_interval_passed() {
        let (limiter, clock) = manual_limiter(1.0);

        limiter.acquire();
        clock.advance(Duration::from_secs(2));

        assert_eq!(limiter.acquire(), Duration::ZERO);
    }

    #[test]
    fn test_concurrent_callers_serialize() {
        let limiter = Arc::new(IntervalLimiter::new(20.0));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    limiter.acquire();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // One free grant, then three 50ms gaps.
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    proptest! {
        #[test]
        fn prop_grants_never_closer_than_interval(
            rate in 0.1f64..50.0,
            gaps_ms in proptest::collection::vec(0u64..3_000, 1..20),
        ) {
            let (limiter, clock) = manual_limiter(rate);
            let interval = limiter.min_interval();

            let mut grants = Vec::new();
            limiter.acquire();
            grants.push(clock.now());

            for gap in gaps_ms {
                clock.advance(Duration::from_millis(gap));
                limiter.acquire();
                grants.push(clock.now());
            }

            for pair in grants.windows(2) {
                prop_assert!(pair[1] - pair[0] >= interval);
            }
        }
    }
}
