//! Image download and caching
//!
//! Image fetches go straight to the media host through the executor. They
//! bypass the API rate limiter and retry controller. Every failure is logged
//! and surfaced as `None`; callers decide what a missing image means.

use crate::error::ApiResult;
use crate::executor::Executor;
use crate::models::Observation;
use inat_core::cache::{EvictionReport, UrlCache};
use inat_core::clock::{Clock, SystemClock};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default pause between items of a batch download
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Named photo renditions served by the media host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhotoSize {
    /// 75px square crop
    Square,
    /// 100px
    Thumb,
    /// 240px
    Small,
    /// 500px
    #[default]
    Medium,
    /// 1024px
    Large,
    /// Uploaded original
    Original,
}

impl PhotoSize {
    /// Every size, smallest first
    pub const ALL: [PhotoSize; 6] = [
        Self::Square,
        Self::Thumb,
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::Original,
    ];

    /// Lowercase name used in URLs and on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Thumb => "thumb",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Original => "original",
        }
    }

    /// Smallest rendition that covers `width` pixels
    #[must_use]
    pub fn for_width(width: u32) -> Self {
        match width {
            0..=75 => Self::Square,
            76..=100 => Self::Thumb,
            101..=240 => Self::Small,
            241..=500 => Self::Medium,
            _ => Self::Large,
        }
    }
}

impl fmt::Display for PhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown photo size '{s}' (expected one of: square, thumb, small, medium, large, original)"
                )
            })
    }
}

/// How `resolve` treats the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheMode {
    /// Return a cached copy when present
    pub use_cache: bool,
    /// Always refetch and overwrite
    pub force_download: bool,
}

impl Default for CacheMode {
    fn default() -> Self {
        Self::cached()
    }
}

impl CacheMode {
    /// Serve from cache when possible
    #[must_use]
    pub fn cached() -> Self {
        Self {
            use_cache: true,
            force_download: false,
        }
    }

    /// Fetch without reading the cache
    #[must_use]
    pub fn bypass() -> Self {
        Self {
            use_cache: false,
            force_download: false,
        }
    }

    /// Refetch and replace the cached copy
    #[must_use]
    pub fn forced() -> Self {
        Self {
            use_cache: true,
            force_download: true,
        }
    }
}

/// Remote image headers plus local cache state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Image URL
    pub url: String,
    /// `Content-Length` reported by the host
    pub size_bytes: Option<u64>,
    /// `Content-Type` reported by the host
    pub content_type: Option<String>,
    /// Local copy, if cached
    pub cached_path: Option<PathBuf>,
}

/// Downloads images into a [`UrlCache`]
pub struct ImageDownloader {
    executor: Executor,
    cache: UrlCache,
    batch_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl ImageDownloader {
    /// Downloader over `executor`, storing into `cache`
    pub fn new(executor: Executor, cache: UrlCache) -> Self {
        Self {
            executor,
            cache,
            batch_delay: DEFAULT_BATCH_DELAY,
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the pause between batch items
    #[must_use]
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Use a different clock for batch pauses
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Underlying cache
    #[must_use]
    pub fn cache(&self) -> &UrlCache {
        &self.cache
    }

    /// Pause between batch items
    #[must_use]
    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    /// Local path for `url`, downloading it if needed
    ///
    /// Returns `None` for an empty URL or any fetch or write failure.
    #[instrument(skip(self))]
    pub fn resolve(&self, url: &str, mode: CacheMode) -> Option<PathBuf> {
        if url.trim().is_empty() {
            warn!("Skipping empty image URL");
            return None;
        }

        if mode.use_cache && !mode.force_download {
            if let Some(path) = self.cache.lookup(url) {
                debug!(path = %path.display(), "Cache hit");
                return Some(path);
            }
        }

        match self.download(url) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(url, error = %e, "Image download failed");
                None
            }
        }
    }

    fn download(&self, url: &str) -> ApiResult<PathBuf> {
        let download = self.executor.fetch_bytes(url)?;
        let path = self
            .cache
            .store(url, &download.bytes, download.content_type.as_deref())?;
        Ok(path)
    }

    /// Resolve `urls` in order, reporting each result to `on_item`
    ///
    /// Sleeps the batch delay between items, not after the last.
    pub fn download_each<F>(&self, urls: &[String], mode: CacheMode, mut on_item: F)
    where
        F: FnMut(usize, &str, Option<&PathBuf>),
    {
        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                self.clock.sleep(self.batch_delay);
            }
            let path = self.resolve(url, mode);
            on_item(index, url, path.as_ref());
        }
    }

    /// Resolve `urls` in order, pairing each with its local path
    pub fn download_many(&self, urls: &[String], use_cache: bool) -> Vec<(String, Option<PathBuf>)> {
        let mode = if use_cache {
            CacheMode::cached()
        } else {
            CacheMode::bypass()
        };

        let mut results = Vec::with_capacity(urls.len());
        self.download_each(urls, mode, |_, url, path| {
            results.push((url.to_string(), path.cloned()));
        });

        let ok = results.iter().filter(|(_, path)| path.is_some()).count();
        info!(requested = urls.len(), downloaded = ok, "Batch download finished");
        results
    }

    /// Download every photo of `observation` at `size`
    ///
    /// Returns the local paths that resolved, in photo order.
    pub fn download_observation_photos(
        &self,
        observation: &Observation,
        size: PhotoSize,
        mode: CacheMode,
    ) -> Vec<PathBuf> {
        let urls = observation.photo_urls(size);
        let mut paths = Vec::with_capacity(urls.len());
        self.download_each(&urls, mode, |_, _, path| paths.extend(path.cloned()));

        debug!(
            observation_id = observation.id,
            photos = urls.len(),
            downloaded = paths.len(),
            "Observation photos resolved"
        );
        paths
    }

    /// Remote size and type of `url`, with its cached path if any
    #[instrument(skip(self))]
    pub fn info(&self, url: &str) -> Option<ImageInfo> {
        match self.executor.head(url) {
            Ok(resource) => Some(ImageInfo {
                cached_path: self.cache.lookup(url),
                url: resource.url,
                size_bytes: resource.size_bytes,
                content_type: resource.content_type,
            }),
            Err(e) => {
                warn!(url, error = %e, "Image info request failed");
                None
            }
        }
    }

    /// Evict cached images older than `max_age_days`, or everything
    pub fn evict(&self, max_age_days: Option<u32>) -> ApiResult<EvictionReport> {
        let max_age =
            max_age_days.map(|days| Duration::from_secs(u64::from(days) * SECONDS_PER_DAY));
        Ok(self.cache.evict(max_age)?)
    }
}

impl fmt::Debug for ImageDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageDownloader")
            .field("cache_dir", &self.cache.dir())
            .field("batch_delay", &self.batch_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;
    use crate::transport::HttpResponse;
    use inat_core::clock::ManualClock;
    use tempfile::TempDir;

    const IMAGE_URL: &str = "https://static.example.org/photos/42/medium.jpg";

    struct Fixture {
        _dir: TempDir,
        transport: Arc<ScriptedTransport>,
        clock: Arc<ManualClock>,
        downloader: ImageDownloader,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let clock = Arc::new(ManualClock::new());
        let executor = Executor::new("https://api.example.org/v1", transport.clone());
        let cache = UrlCache::new(dir.path().join("images")).unwrap();
        let downloader = ImageDownloader::new(executor, cache).with_clock(clock.clone());
        Fixture {
            _dir: dir,
            transport,
            clock,
            downloader,
        }
    }

    fn jpeg(bytes: &[u8]) -> HttpResponse {
        HttpResponse::bytes(200, bytes.to_vec(), Some("image/jpeg"))
    }

    #[test]
    fn test_photo_size_for_width() {
        assert_eq!(PhotoSize::for_width(50), PhotoSize::Square);
        assert_eq!(PhotoSize::for_width(75), PhotoSize::Square);
        assert_eq!(PhotoSize::for_width(100), PhotoSize::Thumb);
        assert_eq!(PhotoSize::for_width(240), PhotoSize::Small);
        assert_eq!(PhotoSize::for_width(320), PhotoSize::Medium);
        assert_eq!(PhotoSize::for_width(2000), PhotoSize::Large);
    }

    #[test]
    fn test_photo_size_parse() {
        assert_eq!("Large".parse::<PhotoSize>().unwrap(), PhotoSize::Large);
        assert_eq!(" thumb ".parse::<PhotoSize>().unwrap(), PhotoSize::Thumb);
        assert!("huge".parse::<PhotoSize>().is_err());
        assert_eq!(PhotoSize::Original.to_string(), "original");
    }

    #[test]
    fn test_cached_resolve_fetches_once() {
        let fx = fixture();
        fx.transport.push(jpeg(b"first"));

        let first = fx.downloader.resolve(IMAGE_URL, CacheMode::cached()).unwrap();
        let second = fx.downloader.resolve(IMAGE_URL, CacheMode::cached()).unwrap();

        assert_eq!(first, second);
        assert_eq!(fx.transport.call_count(), 1);
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
    }

    #[test]
    fn test_forced_resolve_refetches_and_overwrites() {
        let fx = fixture();
        fx.transport.push(jpeg(b"old"));
        fx.transport.push(jpeg(b"new"));

        let path = fx.downloader.resolve(IMAGE_URL, CacheMode::cached()).unwrap();
        let forced = fx.downloader.resolve(IMAGE_URL, CacheMode::forced()).unwrap();

        assert_eq!(path, forced);
        assert_eq!(fx.transport.call_count(), 2);
        assert_eq!(std::fs::read(&forced).unwrap(), b"new");
    }

    #[test]
    fn test_failures_resolve_to_none() {
        let fx = fixture();
        fx.transport.push_status(404);
        fx.transport.push_timeout();

        assert!(fx.downloader.resolve(IMAGE_URL, CacheMode::cached()).is_none());
        assert!(fx.downloader.resolve(IMAGE_URL, CacheMode::cached()).is_none());
        assert!(fx.downloader.resolve("", CacheMode::cached()).is_none());

        // No retries for images and nothing sent for the empty URL
        assert_eq!(fx.transport.call_count(), 2);
        assert!(fx.downloader.cache().lookup(IMAGE_URL).is_none());
    }

    #[test]
    fn test_download_many_pauses_between_items() {
        let fx = fixture();
        let urls: Vec<String> = (1..=3)
            .map(|i| format!("https://static.example.org/photos/{i}/small.jpg"))
            .collect();
        fx.transport.push(jpeg(b"1"));
        fx.transport.push_status(500);
        fx.transport.push(jpeg(b"3"));

        let results = fx.downloader.download_many(&urls, true);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, urls[0]);
        assert!(results[0].1.is_some());
        assert!(results[1].1.is_none());
        assert!(results[2].1.is_some());
        assert_eq!(fx.clock.sleeps(), vec![DEFAULT_BATCH_DELAY; 2]);
    }

    #[test]
    fn test_download_many_without_cache_refetches() {
        let fx = fixture();
        let urls = vec![IMAGE_URL.to_string()];
        fx.transport.push(jpeg(b"a"));
        fx.transport.push(jpeg(b"b"));

        fx.downloader.download_many(&urls, true);
        fx.downloader.download_many(&urls, false);

        assert_eq!(fx.transport.call_count(), 2);
        assert!(fx.clock.sleeps().is_empty());
    }

    #[test]
    fn test_info_reports_cached_path() {
        let fx = fixture();
        fx.transport.push(jpeg(b"pixels"));
        fx.transport.push(HttpResponse {
            status: 200,
            content_type: Some("image/jpeg".into()),
            content_length: Some(6),
            body: Vec::new(),
        });

        let path = fx.downloader.resolve(IMAGE_URL, CacheMode::cached());
        let info = fx.downloader.info(IMAGE_URL).unwrap();

        assert_eq!(info.size_bytes, Some(6));
        assert_eq!(info.cached_path, path);
    }

    #[test]
    fn test_evict_all() {
        let fx = fixture();
        fx.transport.push(jpeg(b"pixels"));
        fx.downloader.resolve(IMAGE_URL, CacheMode::cached()).unwrap();

        let kept = fx.downloader.evict(Some(30)).unwrap();
        assert_eq!(kept.removed, 0);

        let report = fx.downloader.evict(None).unwrap();
        assert!(report.removed >= 1);
        assert_eq!(report.failed, 0);
        assert!(fx.downloader.cache().lookup(IMAGE_URL).is_none());
    }

    #[test]
    fn test_download_observation_photos() {
        let fx = fixture();
        let observation: Observation = serde_json::from_value(serde_json::json!({
            "id": 77,
            "photos": [
                {"id": 1, "small_url": "https://static.example.org/photos/1/small.jpg"},
                {"id": 2, "small_url": "https://static.example.org/photos/2/small.jpg"},
                {"id": 3, "small_url": "https://static.example.org/photos/3/small.jpg"}
            ]
        }))
        .unwrap();
        fx.transport.push(jpeg(b"one"));
        fx.transport.push_status(404);
        fx.transport.push(jpeg(b"three"));

        let paths = fx
            .downloader
            .download_observation_photos(&observation, PhotoSize::Small, CacheMode::cached());

        assert_eq!(paths.len(), 2);
        assert_eq!(std::fs::read(&paths[1]).unwrap(), b"three");
        assert_eq!(fx.transport.requests()[1].url, "https://static.example.org/photos/2/small.jpg");
        assert_eq!(fx.clock.sleeps().len(), 2);
    }
}
