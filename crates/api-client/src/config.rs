//! Configuration for the iNaturalist API client
//!
//! The client never reads the environment or the filesystem; front ends
//! build a [`ClientConfig`] (optionally from [`ApiSettings`]) and hand it
//! over at construction.

use crate::error::{ApiError, ApiResult};
use inat_core::config::ApiSettings;
use inat_core::rate_limit::interval_for_rate;
use inat_core::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public iNaturalist v1 API root
pub const DEFAULT_BASE_URL: &str = "https://api.inaturalist.org/v1";

/// User-Agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("inat-api-client/", env!("CARGO_PKG_VERSION"));

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Versioned API root, e.g. `https://api.inaturalist.org/v1`
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Total attempts per call, including the first
    pub max_retries: u32,
    /// Fixed pause between attempts
    #[serde(with = "duration_secs")]
    pub retry_delay: Duration,
    /// Maximum request rate on this client
    pub rate_limit_per_second: f64,
    /// Bearer token for authenticated endpoints
    pub api_key: Option<String>,
    /// User-Agent header value
    pub user_agent: String,
}

mod duration_secs {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            rate_limit_per_second: 1.0,
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Build a configuration from loaded settings
    #[must_use]
    pub fn from_settings(settings: &ApiSettings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            rate_limit_per_second: settings.rate_limit_per_second,
            api_key: settings.api_key.clone(),
            user_agent: settings
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set the attempt budget
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder-style method to set the retry delay
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Builder-style method to set the request rate
    #[must_use]
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.rate_limit_per_second = per_second;
        self
    }

    /// Builder-style method to set the API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builder-style method to set the User-Agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Retry policy derived from this configuration
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        if self.max_retries == 0 {
            return Err(ApiError::config("max_retries must allow at least one attempt"));
        }

        if interval_for_rate(self.rate_limit_per_second).is_none() {
            return Err(ApiError::config(format!(
                "rate_limit_per_second must be a positive number, got {}",
                self.rate_limit_per_second
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.inaturalist.org/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert!(config.user_agent.starts_with("inat-api-client/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::default()
            .with_base_url("http://localhost:4000/v1")
            .with_timeout(Duration::from_secs(60))
            .with_max_retries(5)
            .with_retry_delay(Duration::from_millis(250))
            .with_api_key("token");

        assert_eq!(config.base_url, "http://localhost:4000/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(250))
        );
        assert_eq!(config.api_key.as_deref(), Some("token"));
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().with_base_url("").validate().is_err());
        assert!(ClientConfig::default()
            .with_base_url("ftp://example.org")
            .validate()
            .is_err());
        assert!(ClientConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ClientConfig::default().with_max_retries(0).validate().is_err());
        assert!(ClientConfig::default().with_rate_limit(0.0).validate().is_err());
        assert!(ClientConfig::default().with_rate_limit(-1.0).validate().is_err());
        assert!(ClientConfig::default()
            .with_rate_limit(f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_settings() {
        let mut settings = ApiSettings::default();
        settings.retry_delay_ms = 1500;
        settings.rate_limit_per_second = 0.5;
        settings.user_agent = Some("field-survey/2.0".into());

        let config = ClientConfig::from_settings(&settings);
        assert_eq!(config.retry_delay, Duration::from_millis(1500));
        assert!((config.rate_limit_per_second - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.user_agent, "field-survey/2.0");
    }

    #[test]
    fn test_serde_durations_in_seconds() {
        let json = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(json["timeout"], 30.0);
        assert_eq!(json["retry_delay"], 1.0);

        let back: ClientConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, ClientConfig::default());
    }
}
