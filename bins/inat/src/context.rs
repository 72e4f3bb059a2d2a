//! Settings resolution and shared handles for commands
//!
//! Settings come from the TOML file (explicit `--config`, `./inat.toml`,
//! or the user config directory), then `INAT_*` environment variables.

use crate::output::OutputFormat;
use anyhow::{Context as _, Result};
use inat_api_client::{ClientConfig, ImageDownloader, INatClient};
use inat_core::cache::UrlCache;
use inat_core::config::Settings;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Everything a command needs
pub struct Context {
    /// Effective settings
    pub settings: Settings,
    /// File the settings were read from, if any
    pub source: Option<PathBuf>,
    /// Output format
    pub format: OutputFormat,
}

impl Context {
    /// Resolve settings from file and environment
    pub fn load(config_path: Option<&Path>, json: bool) -> Result<Self> {
        let source = Settings::locate(config_path)?;
        let mut settings = match &source {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        settings
            .apply_env(|key| std::env::var(key).ok())
            .context("Invalid INAT_* environment variable")?;

        debug!(
            source = ?source,
            base_url = %settings.api.base_url,
            cache_dir = %settings.cache.resolved_dir().display(),
            "Resolved settings"
        );

        Ok(Self {
            settings,
            source,
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
        })
    }

    /// API client built from the effective settings
    pub fn client(&self) -> Result<INatClient> {
        let config = ClientConfig::from_settings(&self.settings.api);
        INatClient::with_config(config).context("Failed to create API client")
    }

    /// Image cache at the configured directory
    pub fn cache(&self) -> Result<UrlCache> {
        let dir = self.settings.cache.resolved_dir();
        UrlCache::new(&dir).with_context(|| format!("Cannot open image cache at {}", dir.display()))
    }

    /// Downloader sharing the client's executor
    pub fn downloader(&self, client: &INatClient) -> Result<ImageDownloader> {
        Ok(client
            .image_downloader(self.cache()?)
            .with_batch_delay(Duration::from_millis(self.settings.cache.batch_delay_ms)))
    }
}
