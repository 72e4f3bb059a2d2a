//! Main API client implementation

use crate::config::ClientConfig;
use crate::endpoints::{ObservationSearch, ObservationsApi, TaxaApi};
use crate::error::{ApiError, ApiResult};
use crate::executor::Executor;
use crate::images::{ImageDownloader, PhotoSize};
use crate::models::QualityGrade;
use crate::pagination::{PageOptions, Paginator, MAX_PER_PAGE};
use crate::request::RequestDescriptor;
use crate::transport::{ReqwestTransport, Transport};
use inat_core::cache::UrlCache;
use inat_core::clock::{Clock, SystemClock};
use inat_core::rate_limit::IntervalLimiter;
use inat_core::retry::{retry, RetryPolicy};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// iNaturalist API client with rate limiting and fixed-delay retry
///
/// Every API call passes through:
/// - the interval rate limiter, once per attempt
/// - the retry controller, for rate-limit and transient failures
/// - the executor, which performs one HTTP call and classifies it
///
/// Cloning is cheap and clones share one rate limiter.
#[derive(Clone)]
pub struct INatClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    executor: Executor,
    limiter: IntervalLimiter,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl INatClient {
    /// Create a client with the default configuration
    pub fn new() -> ApiResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client over the blocking `reqwest` transport
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport), Arc::new(SystemClock))
    }

    /// Create a client over an arbitrary transport and clock
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> ApiResult<Self> {
        config.validate()?;

        let executor = Executor::new(&config.base_url, transport);
        let limiter = IntervalLimiter::with_clock(config.rate_limit_per_second, clock.clone());
        let policy = config.retry_policy();

        debug!(
            base_url = executor.base_url(),
            min_interval_ms = u64::try_from(limiter.min_interval().as_millis()).unwrap_or(u64::MAX),
            max_attempts = policy.max_attempts,
            "Created iNaturalist client"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                executor,
                limiter,
                policy,
                clock,
            }),
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Normalized base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.inner.executor.base_url()
    }

    /// Single-attempt executor shared with image downloads
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    // -------------------------------------------------------------------------
    // Endpoint API accessors
    // -------------------------------------------------------------------------

    /// Access taxa endpoints
    #[must_use]
    pub fn taxa(&self) -> TaxaApi {
        TaxaApi::new(self.clone())
    }

    /// Access observation endpoints
    #[must_use]
    pub fn observations(&self) -> ObservationsApi {
        ObservationsApi::new(self.clone())
    }

    /// Pagination driver over this client
    #[must_use]
    pub fn paginator(&self) -> Paginator<'_> {
        Paginator::new(self)
    }

    /// Image downloader storing into `cache`
    ///
    /// Downloads share the executor but not the rate limiter or retries.
    #[must_use]
    pub fn image_downloader(&self, cache: UrlCache) -> ImageDownloader {
        ImageDownloader::new(self.inner.executor.clone(), cache)
            .with_clock(self.inner.clock.clone())
    }

    // -------------------------------------------------------------------------
    // Rate-limited, retried requests
    // -------------------------------------------------------------------------

    /// Execute `request`, returning the decoded JSON body
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub fn send(&self, request: &RequestDescriptor) -> ApiResult<Value> {
        let start = Instant::now();

        let result = retry(&self.inner.policy, self.inner.clock.as_ref(), |attempt| {
            let waited = self.inner.limiter.acquire();
            if !waited.is_zero() {
                debug!(
                    attempt,
                    waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    "Rate limited before attempt"
                );
            }
            self.inner.executor.execute(request)
        });

        match result {
            Ok(value) => {
                debug!(
                    elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Request succeeded"
                );
                Ok(value)
            }
            Err(e) => {
                let error = ApiError::from(e);
                debug!(error = %error, "Request failed");
                Err(error)
            }
        }
    }

    /// Execute `request` and decode the body into `T`
    pub fn get<T: DeserializeOwned>(&self, request: &RequestDescriptor) -> ApiResult<T> {
        let value = self.send(request)?;
        serde_json::from_value(value).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }

    // -------------------------------------------------------------------------
    // Composite operations
    // -------------------------------------------------------------------------

    /// Up to `max` photo URLs from research-grade observations of a taxon
    #[instrument(skip(self))]
    pub fn species_photo_urls(
        &self,
        taxon_id: u64,
        size: PhotoSize,
        max: usize,
    ) -> ApiResult<Vec<String>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let search = ObservationSearch {
            taxon_id: Some(taxon_id),
            quality_grade: Some(QualityGrade::Research),
            photos: Some(true),
            ..ObservationSearch::default()
        };
        let per_page = u32::try_from(max).unwrap_or(MAX_PER_PAGE).min(MAX_PER_PAGE);
        let options = PageOptions::new(per_page).with_max_results(max);

        let mut urls = Vec::with_capacity(max);
        for observation in self.observations().search_all(&search, options)? {
            for url in observation.photo_urls(size) {
                if urls.len() == max {
                    return Ok(urls);
                }
                urls.push(url);
            }
        }
        Ok(urls)
    }
}

impl std::fmt::Debug for INatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("INatClient")
            .field("base_url", &self.base_url())
            .field("limiter", &self.inner.limiter)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}
