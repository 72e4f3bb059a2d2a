//! Typed API records
//!
//! Every field is optional or defaulted so partial records from any
//! endpoint still decode.

use crate::images::PhotoSize;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope shared by list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    /// Matches across all pages
    #[serde(deserialize_with = "null_as_default")]
    pub total_results: u64,
    /// 1-based page number
    pub page: u32,
    /// Requested page size
    pub per_page: u32,
    /// Items on this page
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            total_results: 0,
            page: 0,
            per_page: 0,
            results: Vec::new(),
        }
    }
}

/// A photo with per-size URLs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Photo {
    pub id: u64,
    /// Base URL, used when a specific size is missing
    pub url: Option<String>,
    pub attribution: Option<String>,
    pub license_code: Option<String>,
    pub square_url: Option<String>,
    pub thumb_url: Option<String>,
    pub small_url: Option<String>,
    pub medium_url: Option<String>,
    pub large_url: Option<String>,
    pub original_url: Option<String>,
}

impl Photo {
    /// URL at `size`, falling back to the base URL
    #[must_use]
    pub fn url_for(&self, size: PhotoSize) -> Option<&str> {
        let sized = match size {
            PhotoSize::Square => &self.square_url,
            PhotoSize::Thumb => &self.thumb_url,
            PhotoSize::Small => &self.small_url,
            PhotoSize::Medium => &self.medium_url,
            PhotoSize::Large => &self.large_url,
            PhotoSize::Original => &self.original_url,
        };
        sized
            .as_deref()
            .or(self.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Wrapper used by `taxon_photos` and `observation_photos`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoLink {
    pub id: u64,
    pub position: Option<u32>,
    pub photo: Photo,
}

/// Conservation status summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConservationStatus {
    pub status: String,
    pub authority: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// A node in the classification hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxon {
    pub id: u64,
    /// Scientific name
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rank: String,
    #[serde(deserialize_with = "null_as_default")]
    pub rank_level: f64,
    pub is_active: Option<bool>,
    pub iconic_taxon_id: Option<u64>,
    pub iconic_taxon_name: Option<String>,
    pub preferred_common_name: Option<String>,
    pub parent_id: Option<u64>,
    /// Root-first lineage; the API includes the taxon itself last
    #[serde(deserialize_with = "null_as_default")]
    pub ancestor_ids: Vec<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub observations_count: u64,
    pub default_photo: Option<Photo>,
    #[serde(deserialize_with = "null_as_default")]
    pub taxon_photos: Vec<PhotoLink>,
    pub conservation_status: Option<ConservationStatus>,
    pub wikipedia_summary: Option<String>,
    pub wikipedia_url: Option<String>,
}

impl Taxon {
    /// Rank level of species; lower levels are infraspecific
    pub const SPECIES_RANK_LEVEL: f64 = 10.0;

    /// "Common name (Scientific name)", or just the scientific name
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.preferred_common_name.as_deref() {
            Some(common) if !common.is_empty() => format!("{common} ({})", self.name),
            _ => self.name.clone(),
        }
    }

    /// Species or below
    #[must_use]
    pub fn is_species_or_lower(&self) -> bool {
        self.rank_level > 0.0 && self.rank_level <= Self::SPECIES_RANK_LEVEL
    }

    /// Photo URLs at `size`; the default photo when no taxon photos are listed
    #[must_use]
    pub fn photo_urls(&self, size: PhotoSize) -> Vec<String> {
        if self.taxon_photos.is_empty() {
            return self
                .default_photo
                .iter()
                .filter_map(|p| p.url_for(size))
                .map(str::to_string)
                .collect();
        }
        self.taxon_photos
            .iter()
            .filter_map(|link| link.photo.url_for(size))
            .map(str::to_string)
            .collect()
    }

    /// Ancestor ids excluding the taxon itself
    #[must_use]
    pub fn strict_ancestor_ids(&self) -> Vec<u64> {
        self.ancestor_ids
            .iter()
            .copied()
            .filter(|id| *id != self.id)
            .collect()
    }
}

/// Identification confidence tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityGrade {
    /// Community-confirmed
    Research,
    /// Awaiting identification
    NeedsId,
    /// Missing data or flagged
    #[default]
    Casual,
    /// A grade this client does not know
    #[serde(other)]
    Unknown,
}

impl QualityGrade {
    /// Query-string form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::NeedsId => "needs_id",
            Self::Casual => "casual",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for QualityGrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "research" => Ok(Self::Research),
            "needs_id" | "needs-id" => Ok(Self::NeedsId),
            "casual" => Ok(Self::Casual),
            other => Err(format!(
                "unknown quality grade {other:?} (expected research, needs_id or casual)"
            )),
        }
    }
}

impl std::fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub login: String,
    pub name: Option<String>,
    pub icon_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub observations_count: u64,
}

/// GeoJSON point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoJson {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: Vec<f64>,
}

/// A single sighting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Observation {
    pub id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub uuid: String,
    #[serde(deserialize_with = "null_as_default")]
    pub quality_grade: QualityGrade,
    pub species_guess: Option<String>,
    pub description: Option<String>,
    pub taxon: Option<Taxon>,
    pub observed_on: Option<String>,
    pub time_observed_at: Option<String>,
    pub created_at: Option<String>,
    pub place_guess: Option<String>,
    /// `"lat,lng"`
    pub location: Option<String>,
    pub geojson: Option<GeoJson>,
    pub geoprivacy: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub obscured: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub photos: Vec<Photo>,
    #[serde(deserialize_with = "null_as_default")]
    pub observation_photos: Vec<PhotoLink>,
    pub user: Option<User>,
    #[serde(deserialize_with = "null_as_default")]
    pub identifications_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub comments_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub faves_count: u64,
    pub license_code: Option<String>,
    pub uri: Option<String>,
}

impl Observation {
    /// Species guess, taxon name, or a numbered placeholder
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(guess) = self.species_guess.as_deref().filter(|g| !g.is_empty()) {
            return guess.to_string();
        }
        if let Some(taxon) = &self.taxon {
            return taxon.name.clone();
        }
        format!("Observation #{}", self.id)
    }

    /// Research grade
    #[must_use]
    pub fn is_research_grade(&self) -> bool {
        self.quality_grade == QualityGrade::Research
    }

    /// `(latitude, longitude)` from `location`, else from `geojson`
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        if let Some((lat, lng)) = self.location.as_deref().and_then(|l| l.split_once(',')) {
            if let (Ok(lat), Ok(lng)) = (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
                return Some((lat, lng));
            }
        }
        match self.geojson.as_ref().map(|g| g.coordinates.as_slice()) {
            Some([lng, lat, ..]) => Some((*lat, *lng)),
            _ => None,
        }
    }

    /// Photo URLs at `size`, from `photos` or else `observation_photos`
    #[must_use]
    pub fn photo_urls(&self, size: PhotoSize) -> Vec<String> {
        let photos: Vec<&Photo> = if self.photos.is_empty() {
            self.observation_photos.iter().map(|link| &link.photo).collect()
        } else {
            self.photos.iter().collect()
        };
        photos
            .into_iter()
            .filter_map(|p| p.url_for(size))
            .map(str::to_string)
            .collect()
    }
}

/// Per-taxon tally from `observations/species_counts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesCount {
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub taxon: Taxon,
}

/// Per-user tally from `observations/identifiers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierCount {
    pub user_id: u64,
    /// Identifications made
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub user: User,
}

/// Per-user tally from `observations/observers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverCount {
    pub user_id: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub observation_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub species_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub user: User,
}

/// Observation counts bucketed by time
///
/// Bucket keys are whatever the API reports for the interval: dates such as
/// `2024-05-01` for calendar intervals, `1`..`12` for `month_of_year`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub interval: String,
    pub buckets: BTreeMap<String, u64>,
}

impl Histogram {
    /// Sum over every bucket
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.values().sum()
    }
}

/// Raw `observations/histogram` body: `{"results": {"<interval>": {...}}}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HistogramEnvelope {
    #[serde(deserialize_with = "null_as_default")]
    pub results: BTreeMap<String, BTreeMap<String, Option<u64>>>,
}

impl HistogramEnvelope {
    /// Buckets for `interval`, or the only series when the key differs
    pub(crate) fn into_histogram(mut self, interval: &str) -> Histogram {
        let series = match self.results.remove(interval) {
            Some(series) => series,
            None if self.results.len() == 1 => self.results.into_values().next().unwrap_or_default(),
            None => BTreeMap::new(),
        };
        Histogram {
            interval: interval.to_string(),
            buckets: series
                .into_iter()
                .map(|(bucket, count)| (bucket, count.unwrap_or_default()))
                .collect(),
        }
    }
}
