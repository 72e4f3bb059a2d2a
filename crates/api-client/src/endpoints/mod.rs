//! Endpoint-specific API implementations
//!
//! Each module provides a typed interface for one group of iNaturalist v1
//! endpoints. Option records replace free-form query maps.
//!
//! | Module | Endpoints | Description |
//! |--------|-----------|-------------|
//! | `taxa` | `/taxa`, `/taxa/{id}`, `/taxa/autocomplete` | Species lookup and classification |
//! | `observations` | `/observations`, `/observations/{id}`, `/observations/species_counts`, `/observations/identifiers`, `/observations/observers`, `/observations/histogram` | Sightings, counts, tallies and histograms |

pub mod observations;
pub mod taxa;

pub use observations::{
    Around, BoundingBox, HistogramInterval, HistogramQuery, ObservationSearch, ObservationsApi,
    SpeciesCountQuery, UserCountQuery,
};
pub use taxa::{TaxaApi, TaxonSearch};
