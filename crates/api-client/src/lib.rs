//! Blocking client for the iNaturalist v1 REST API
//!
//! This crate provides typed access to taxa and observations, plus image
//! download into an on-disk cache.
//!
//! # Features
//!
//! - **Rate limiting**: a minimum interval between API calls, shared by clones of a client
//! - **Fixed-delay retry**: rate-limit and transient failures are retried a bounded number of times
//! - **Pagination**: collect list endpoints page by page with page and result caps
//! - **Image cache**: URL-addressed files with age-based eviction
//! - **Request correlation**: every HTTP call carries an `X-Request-ID`
//!
//! # Example
//!
//! ```rust,no_run
//! use inat_api_client::{ClientConfig, INatClient, TaxonSearch};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = INatClient::with_config(ClientConfig::default())?;
//!
//!     let taxa = client.taxa().search(&TaxonSearch::query("Pica pica"))?;
//!     for taxon in &taxa {
//!         println!("{} ({} observations)", taxon.display_name(), taxon.observations_count);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod images;
pub mod models;
pub mod pagination;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::INatClient;
pub use config::ClientConfig;
pub use endpoints::{
    HistogramInterval, HistogramQuery, ObservationSearch, SpeciesCountQuery, TaxonSearch,
    UserCountQuery,
};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use images::{CacheMode, ImageDownloader, PhotoSize};
pub use pagination::PageOptions;
pub use request::{QueryValue, RequestDescriptor};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::INatClient;
    pub use crate::config::ClientConfig;
    pub use crate::endpoints::{
        Around, BoundingBox, HistogramInterval, HistogramQuery, ObservationSearch, ObservationsApi,
        SpeciesCountQuery, TaxaApi, TaxonSearch, UserCountQuery,
    };
    pub use crate::error::{ApiError, ApiResult, ErrorKind};
    pub use crate::images::{CacheMode, ImageDownloader, ImageInfo, PhotoSize};
    pub use crate::models::{
        Histogram, IdentifierCount, Observation, ObserverCount, Page, Photo, QualityGrade,
        SpeciesCount, Taxon, User,
    };
    pub use crate::pagination::{PageOptions, Paginator};
    pub use crate::request::RequestDescriptor;
}
