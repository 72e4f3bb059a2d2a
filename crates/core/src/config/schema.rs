//! Settings schema

use crate::cache::default_cache_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root settings document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Remote API access
    #[serde(default)]
    pub api: ApiSettings,

    /// Image cache
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Remote API access settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Versioned API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per call, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Maximum request rate
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: f64,

    /// Bearer token for authenticated endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the default User-Agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            rate_limit_per_second: default_rate_limit(),
            api_key: None,
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.inaturalist.org/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_rate_limit() -> f64 {
    1.0
}

/// Image cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Cache directory; the user cache directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Pause between images in a batch download, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Age limit used by `cache evict` when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u32>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            batch_delay_ms: default_batch_delay_ms(),
            max_age_days: None,
        }
    }
}

impl CacheSettings {
    /// Configured directory, or the default location
    #[must_use]
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_cache_dir)
    }
}

fn default_batch_delay_ms() -> u64 {
    500
}
