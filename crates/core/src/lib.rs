//! Core utilities for the iNaturalist client toolkit
//!
//! Shared building blocks used by the API client and the command-line tool:
//!
//! - **Error handling**: Coded errors with context and recovery suggestions
//! - **Clock**: Swappable time source for deterministic tests
//! - **Rate limiting**: Minimum interval between outbound requests
//! - **Retry**: Bounded attempts with a fixed delay
//! - **Cache**: URL-addressed file cache with age-based eviction
//! - **Configuration**: TOML settings with environment overlay
//!
//! # Example
//!
//! ```rust,no_run
//! use inat_core::{cache::UrlCache, rate_limit::IntervalLimiter};
//!
//! let limiter = IntervalLimiter::new(1.0);
//! limiter.acquire();
//!
//! let cache = UrlCache::open_default().expect("cache directory");
//! println!("{} cached images", cache.stats().expect("stats").entries);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod retry;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CacheEntry, CacheStats, EvictionReport, UrlCache};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::Settings;
    pub use crate::error::{Error, ErrorCode, Result, ResultExt};
    pub use crate::rate_limit::IntervalLimiter;
    pub use crate::retry::{retry, RetryError, RetryPolicy, Retryable};
}
