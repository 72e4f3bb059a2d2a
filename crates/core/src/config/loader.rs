//! Settings file discovery, parsing and environment overlay

use super::schema::Settings;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "inat.toml";

/// `<user config dir>/inat-tools/config.toml`
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("inat-tools").join("config.toml"))
}

impl Settings {
    /// Load settings from `path`, or the first file found in the standard
    /// locations, or defaults
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match Self::locate(path)? {
            Some(found) => Self::from_file(&found),
            None => {
                debug!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Resolve which settings file [`load`](Self::load) would read
    pub fn locate(path: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(explicit) = path {
            if !explicit.is_file() {
                return Err(Error::config_not_found(explicit));
            }
            return Ok(Some(explicit.to_path_buf()));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Ok(Some(local));
        }

        Ok(user_config_path().filter(|p| p.is_file()))
    }

    /// Read and parse a settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Reading settings file {}", path.display()))?;
        let settings = Self::from_toml_str(&content)
            .context(format!("Parsing settings file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render settings as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to render settings: {e}")))
    }

    /// Overlay `INAT_*` variables obtained through `lookup`
    ///
    /// Empty values are ignored. Unparseable numbers are reported with the
    /// offending variable name.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("INAT_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = get("INAT_API_KEY") {
            self.api.api_key = Some(value);
        }
        if let Some(value) = get("INAT_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_var("INAT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("INAT_MAX_RETRIES") {
            self.api.max_retries = parse_var("INAT_MAX_RETRIES", &value)?;
        }
        if let Some(value) = get("INAT_RATE_LIMIT") {
            self.api.rate_limit_per_second = parse_var("INAT_RATE_LIMIT", &value)?;
        }
        if let Some(value) = get("INAT_CACHE_DIR") {
            self.cache.dir = Some(PathBuf::from(value));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_value(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, "https://api.inaturalist.org/v1");
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.api.max_retries, 3);
        assert_eq!(settings.api.retry_delay_ms, 1000);
        assert!((settings.api.rate_limit_per_second - 1.0).abs() < f64::EPSILON);
        assert_eq!(settings.cache.batch_delay_ms, 500);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [api]
            rate_limit_per_second = 0.5

            [cache]
            dir = "/var/cache/inat"
            "#,
        )
        .unwrap();

        assert!((settings.api.rate_limit_per_second - 0.5).abs() < f64::EPSILON);
        assert_eq!(settings.api.max_retries, 3);
        assert_eq!(settings.cache.resolved_dir(), PathBuf::from("/var/cache/inat"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Settings::from_toml_str("[api\nbase_url = 1").unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParseError);
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "[api]\ntimeout_secs = 5\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.api.timeout_secs, 5);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let err = Settings::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("INAT_BASE_URL", "http://localhost:4000/v1"),
                ("INAT_API_KEY", "secret"),
                ("INAT_MAX_RETRIES", "5"),
                ("INAT_RATE_LIMIT", "2.5"),
                ("INAT_CACHE_DIR", "/tmp/inat"),
                ("INAT_TIMEOUT_SECS", ""),
            ]))
            .unwrap();

        assert_eq!(settings.api.base_url, "http://localhost:4000/v1");
        assert_eq!(settings.api.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.api.max_retries, 5);
        assert!((settings.api.rate_limit_per_second - 2.5).abs() < f64::EPSILON);
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.cache.dir, Some(PathBuf::from("/tmp/inat")));
    }

    #[test]
    fn test_apply_env_rejects_bad_number() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(env(&[("INAT_MAX_RETRIES", "many")]))
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert!(err.message.contains("INAT_MAX_RETRIES"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut settings = Settings::default();
        settings.api.api_key = Some("k".to_string());

        let rendered = settings.to_toml_string().unwrap();
        assert!(rendered.contains("[api]"));
        assert_eq!(Settings::from_toml_str(&rendered).unwrap(), settings);
    }
}
