//! URL-addressed file cache for downloaded images
//!
//! Each cached URL maps to one data file named after the SHA-256 of the URL
//! plus the extension found in the URL path (default `jpg`). A JSON sidecar
//! `<hash>.meta.json` records where the bytes came from and when they were
//! stored. Writes go through `<hash>.<ext>.part` first.
//!
//! Data files always carry a single extension, so no URL can produce a name
//! that collides with a sidecar or a partial write.
//!
//! # Example
//!
//! ```rust,ignore
//! use inat_core::cache::UrlCache;
//! use std::time::Duration;
//!
//! let cache = UrlCache::new("/tmp/inat-images")?;
//! let path = cache.store("https://example.org/p/1/medium.jpg", &bytes, Some("image/jpeg"))?;
//! assert_eq!(cache.lookup("https://example.org/p/1/medium.jpg"), Some(path));
//!
//! // Drop anything older than a week
//! let report = cache.evict(Some(Duration::from_secs(7 * 24 * 3600)))?;
//! ```

use crate::error::{Error, Result, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const META_SUFFIX: &str = ".meta.json";
const PARTIAL_SUFFIX: &str = ".part";
const DEFAULT_EXTENSION: &str = "jpg";
const MAX_EXTENSION_LEN: usize = 5;

/// Default on-disk location: `<user cache dir>/inat-tools/images`
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("inat-tools")
        .join("images")
}

/// Metadata describing one cached URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Source URL; unknown when the sidecar is missing
    #[serde(default)]
    pub url: Option<String>,
    /// Data file name inside the cache directory
    pub file_name: String,
    /// When the entry was stored
    pub created_at: DateTime<Utc>,
    /// Size of the data file in bytes
    pub size_bytes: u64,
    /// MIME type reported by the server
    #[serde(default)]
    pub content_type: Option<String>,
}

impl CacheEntry {
    /// Age of the entry relative to now; zero for timestamps in the future
    #[must_use]
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Summary of the cache directory contents
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Path to the cache directory
    pub cache_dir: PathBuf,
    /// Number of cached files
    pub entries: usize,
    /// Total size of cached data in bytes
    pub total_bytes: u64,
    /// Creation time of the oldest entry
    pub oldest: Option<DateTime<Utc>>,
    /// Creation time of the newest entry
    pub newest: Option<DateTime<Utc>>,
}

/// Outcome of an eviction sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvictionReport {
    /// Data files deleted
    pub removed: usize,
    /// Files that could not be deleted
    pub failed: usize,
    /// Bytes released by deleted data files
    pub freed_bytes: u64,
}

/// File cache keyed by URL
#[derive(Debug, Clone)]
pub struct UrlCache {
    dir: PathBuf,
}

impl UrlCache {
    /// Open a cache rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::cache_dir_unavailable(&dir).with_source(e))?;
        Ok(Self { dir })
    }

    /// Open the cache at [`default_cache_dir`]
    pub fn open_default() -> Result<Self> {
        Self::new(default_cache_dir())
    }

    /// Cache directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic data file name for a URL
    #[must_use]
    pub fn file_name_for(url: &str) -> String {
        format!("{}.{}", hash_url(url), url_extension(url))
    }

    /// Where the data for `url` lives, whether or not it is cached
    #[must_use]
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(Self::file_name_for(url))
    }

    /// Sidecar metadata path for `url`
    #[must_use]
    pub fn meta_path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}{META_SUFFIX}", hash_url(url)))
    }

    /// Cached data path for `url`, if present
    #[must_use]
    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = self.path_for(url);
        path.is_file().then_some(path)
    }

    /// Write `bytes` for `url`, replacing any previous entry
    pub fn store(&self, url: &str, bytes: &[u8], content_type: Option<&str>) -> Result<PathBuf> {
        let file_name = Self::file_name_for(url);
        let path = self.dir.join(&file_name);
        let partial = self.dir.join(format!("{file_name}{PARTIAL_SUFFIX}"));

        fs::write(&partial, bytes).context(format!("Writing {}", partial.display()))?;
        fs::rename(&partial, &path).context(format!("Finalizing {}", path.display()))?;

        let entry = CacheEntry {
            url: Some(url.to_string()),
            file_name,
            created_at: Utc::now(),
            size_bytes: bytes.len() as u64,
            content_type: content_type.map(str::to_string),
        };
        let meta = serde_json::to_vec_pretty(&entry)?;
        fs::write(self.meta_path_for(url), meta).context("Writing cache metadata")?;

        debug!(url, path = %path.display(), size_bytes = entry.size_bytes, "Stored cache entry");
        Ok(path)
    }

    /// Metadata for a cached URL
    #[must_use]
    pub fn entry(&self, url: &str) -> Option<CacheEntry> {
        let path = self.lookup(url)?;
        self.entry_for_path(&path).ok()
    }

    /// All cached entries, in no particular order
    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for path in self.data_files()? {
            match self.entry_for_path(&path) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable cache file"),
            }
        }
        Ok(entries)
    }

    /// Count and size of cached entries
    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries()?;
        Ok(CacheStats {
            cache_dir: self.dir.clone(),
            entries: entries.len(),
            total_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            oldest: entries.iter().map(|e| e.created_at).min(),
            newest: entries.iter().map(|e| e.created_at).max(),
        })
    }

    /// Delete entries older than `max_age`, or every file when `None`
    ///
    /// Per-file failures are counted and logged; the sweep continues.
    pub fn evict(&self, max_age: Option<Duration>) -> Result<EvictionReport> {
        let report = match max_age {
            None => self.evict_all()?,
            Some(max_age) => self.evict_older_than(max_age)?,
        };

        info!(
            removed = report.removed,
            failed = report.failed,
            freed_bytes = report.freed_bytes,
            "Cache eviction finished"
        );
        Ok(report)
    }

    fn evict_all(&self) -> Result<EvictionReport> {
        let mut report = EvictionReport::default();

        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if !path.is_file() {
                continue;
            }

            let is_data = !is_bookkeeping(&path);
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match fs::remove_file(&path) {
                Ok(()) if is_data => {
                    report.removed += 1;
                    report.freed_bytes += size;
                }
                Ok(()) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    fn evict_older_than(&self, max_age: Duration) -> Result<EvictionReport> {
        let mut report = EvictionReport::default();

        for path in self.data_files()? {
            let entry = match self.entry_for_path(&path) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot determine cache file age");
                    report.failed += 1;
                    continue;
                }
            };

            if entry.age() <= max_age {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    report.removed += 1;
                    report.freed_bytes += entry.size_bytes;
                    let meta = sidecar_path(&path);
                    if meta.exists() {
                        if let Err(e) = fs::remove_file(&meta) {
                            warn!(path = %meta.display(), error = %e, "Failed to remove cache metadata");
                            report.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    fn data_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.is_file() && !is_bookkeeping(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Sidecar metadata when readable, otherwise derived from the file itself
    fn entry_for_path(&self, path: &Path) -> Result<CacheEntry> {
        let metadata = fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let sidecar = fs::read(sidecar_path(path))
            .ok()
            .and_then(|raw| serde_json::from_slice::<CacheEntry>(&raw).ok());

        if let Some(mut entry) = sidecar {
            entry.file_name = file_name;
            entry.size_bytes = metadata.len();
            return Ok(entry);
        }

        Ok(CacheEntry {
            url: None,
            file_name,
            created_at: DateTime::<Utc>::from(metadata.modified()?),
            size_bytes: metadata.len(),
            content_type: None,
        })
    }
}

fn hash_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lower-cased extension of the URL path, or `jpg`
fn url_extension(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let without_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);

    let Some((_, path)) = without_scheme.split_once('/') else {
        return DEFAULT_EXTENSION.to_string();
    };

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// `<hash>.<ext>` -> `<hash>.meta.json`
fn sidecar_path(data_path: &Path) -> PathBuf {
    data_path.with_extension(&META_SUFFIX[1..])
}

/// Sidecars and partial writes; anything else in the directory is data
fn is_bookkeeping(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(META_SUFFIX) || (name.ends_with(PARTIAL_SUFFIX) && name.matches('.').count() > 1)
}
