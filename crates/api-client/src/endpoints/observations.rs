//! Observations API endpoints
//!
//! Maps to `/observations` and its aggregate sub-resources:
//! - Search observations with filters and pagination
//! - Get a single observation by ID
//! - Count matches without fetching them
//! - Per-species tallies, optionally around a location
//! - Per-user tallies of identifiers and observers
//! - Time histograms

use crate::client::INatClient;
use crate::error::ApiResult;
use crate::models::{
    Histogram, HistogramEnvelope, IdentifierCount, Observation, ObserverCount, Page, QualityGrade,
    SpeciesCount,
};
use crate::pagination::{PageOptions, MAX_PER_PAGE};
use crate::request::RequestDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Default size of the `latest` and `popular` presets
pub const PRESET_PAGE_SIZE: u32 = 30;

/// Observations API interface
#[derive(Clone)]
pub struct ObservationsApi {
    client: INatClient,
}

impl ObservationsApi {
    /// Create a new observations API interface
    pub(crate) fn new(client: INatClient) -> Self {
        Self { client }
    }

    /// Search observations (one page)
    ///
    /// GET /observations
    #[instrument(skip(self))]
    pub fn search(&self, search: &ObservationSearch) -> ApiResult<Vec<Observation>> {
        let page: Page<Observation> = self.client.get(&search.to_request())?;
        Ok(page.results)
    }

    /// Search observations across every page
    pub fn search_all(
        &self,
        search: &ObservationSearch,
        options: PageOptions,
    ) -> ApiResult<Vec<Observation>> {
        self.client.paginator().collect(&search.to_request(), options)
    }

    /// Get a single observation by ID
    ///
    /// GET /observations/{id}. A 404 or an empty result is `None`.
    #[instrument(skip(self))]
    pub fn get(&self, id: u64) -> ApiResult<Option<Observation>> {
        let request = RequestDescriptor::get(format!("observations/{id}"));
        match self.client.get::<Page<Observation>>(&request) {
            Ok(page) => Ok(page.results.into_iter().next()),
            Err(e) if e.is_not_found() => {
                debug!(id, "Observation not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Number of observations matching `search`
    ///
    /// Sends `per_page=0` so only the total comes back.
    pub fn count(&self, search: &ObservationSearch) -> ApiResult<u64> {
        let mut request = search.to_request();
        request.set_param("per_page", 0u32);
        request.params.remove("page");

        let page: Page<Observation> = self.client.get(&request)?;
        Ok(page.total_results)
    }

    /// Observation tallies per species
    ///
    /// GET /observations/species_counts
    #[instrument(skip(self))]
    pub fn species_counts(&self, query: &SpeciesCountQuery) -> ApiResult<Vec<SpeciesCount>> {
        let page: Page<SpeciesCount> = self.client.get(&query.to_request())?;
        Ok(page.results)
    }

    /// Users ranked by identifications made
    ///
    /// GET /observations/identifiers
    #[instrument(skip(self))]
    pub fn identifiers(&self, query: &UserCountQuery) -> ApiResult<Vec<IdentifierCount>> {
        let page: Page<IdentifierCount> =
            self.client.get(&query.to_request("observations/identifiers"))?;
        Ok(page.results)
    }

    /// Users ranked by observations made
    ///
    /// GET /observations/observers
    #[instrument(skip(self))]
    pub fn observers(&self, query: &UserCountQuery) -> ApiResult<Vec<ObserverCount>> {
        let page: Page<ObserverCount> = self.client.get(&query.to_request("observations/observers"))?;
        Ok(page.results)
    }

    /// Observation counts per time bucket
    ///
    /// GET /observations/histogram
    #[instrument(skip(self))]
    pub fn histogram(&self, query: &HistogramQuery) -> ApiResult<Histogram> {
        let envelope: HistogramEnvelope = self.client.get(&query.to_request())?;
        Ok(envelope.into_histogram(query.interval.as_str()))
    }

    /// Newest observations with photos, research grade unless overridden
    pub fn latest(
        &self,
        taxon_id: Option<u64>,
        place_id: Option<u64>,
        quality_grade: Option<QualityGrade>,
        per_page: u32,
    ) -> ApiResult<Vec<Observation>> {
        let search = ObservationSearch {
            taxon_id,
            place_id,
            quality_grade: Some(quality_grade.unwrap_or(QualityGrade::Research)),
            photos: Some(true),
            order_by: Some("observed_on".to_string()),
            order: Some("desc".to_string()),
            per_page: Some(per_page),
            ..ObservationSearch::default()
        };
        self.search(&search)
    }

    /// Most-voted observations with photos
    pub fn popular(
        &self,
        taxon_id: Option<u64>,
        place_id: Option<u64>,
        per_page: u32,
    ) -> ApiResult<Vec<Observation>> {
        let search = ObservationSearch {
            taxon_id,
            place_id,
            photos: Some(true),
            order_by: Some("votes".to_string()),
            order: Some("desc".to_string()),
            per_page: Some(per_page),
            ..ObservationSearch::default()
        };
        self.search(&search)
    }
}

/// Rectangle given by its south-west and north-east corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// South-west latitude
    pub swlat: f64,
    /// South-west longitude
    pub swlng: f64,
    /// North-east latitude
    pub nelat: f64,
    /// North-east longitude
    pub nelng: f64,
}

/// Circle around a point, radius in kilometres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Around {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Radius in km
    pub radius: f64,
}

impl Around {
    fn apply(self, request: RequestDescriptor) -> RequestDescriptor {
        request
            .param("lat", self.lat)
            .param("lng", self.lng)
            .param("radius", self.radius)
    }
}

/// Filters for `GET /observations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSearch {
    pub taxon_id: Option<u64>,
    pub taxon_name: Option<String>,
    pub iconic_taxa: Vec<String>,
    pub place_id: Option<u64>,
    pub bounding_box: Option<BoundingBox>,
    pub around: Option<Around>,
    /// Exact date, `YYYY-MM-DD`
    pub observed_on: Option<String>,
    /// Observed on or after
    pub d1: Option<String>,
    /// Observed on or before
    pub d2: Option<String>,
    pub year: Option<u32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub quality_grade: Option<QualityGrade>,
    /// `open`, `obscured` or `private`
    pub geoprivacy: Option<String>,
    pub photos: Option<bool>,
    pub sounds: Option<bool>,
    pub geo: Option<bool>,
    pub user_id: Option<u64>,
    pub user_login: Option<String>,
    pub project_id: Option<u64>,
    pub identified: Option<bool>,
    /// Sort field, e.g. `observed_on`, `votes`
    pub order_by: Option<String>,
    /// `asc` or `desc`
    pub order: Option<String>,
    /// Page size, at most 200
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

impl ObservationSearch {
    /// Request descriptor for these filters
    #[must_use]
    pub fn to_request(&self) -> RequestDescriptor {
        let mut request = RequestDescriptor::get("observations")
            .param_opt("taxon_id", self.taxon_id)
            .param_opt("taxon_name", self.taxon_name.as_ref())
            .param_opt("iconic_taxa", Some(self.iconic_taxa.clone()))
            .param_opt("place_id", self.place_id)
            .param_opt("observed_on", self.observed_on.as_ref())
            .param_opt("d1", self.d1.as_ref())
            .param_opt("d2", self.d2.as_ref())
            .param_opt("year", self.year)
            .param_opt("month", self.month)
            .param_opt("day", self.day)
            .param_opt("quality_grade", self.quality_grade.map(QualityGrade::as_str))
            .param_opt("geoprivacy", self.geoprivacy.as_ref())
            .param_opt("photos", self.photos)
            .param_opt("sounds", self.sounds)
            .param_opt("geo", self.geo)
            .param_opt("user_id", self.user_id)
            .param_opt("user_login", self.user_login.as_ref())
            .param_opt("project_id", self.project_id)
            .param_opt("identified", self.identified)
            .param_opt("order_by", self.order_by.as_ref())
            .param_opt("order", self.order.as_ref())
            .param_opt("per_page", self.per_page.map(|n| n.min(MAX_PER_PAGE)))
            .param_opt("page", self.page);

        if let Some(bbox) = self.bounding_box {
            request = request
                .param("swlat", bbox.swlat)
                .param("swlng", bbox.swlng)
                .param("nelat", bbox.nelat)
                .param("nelng", bbox.nelng);
        }
        if let Some(around) = self.around {
            request = around.apply(request);
        }
        request
    }
}

/// Filters for `GET /observations/species_counts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCountQuery {
    pub place_id: Option<u64>,
    pub taxon_id: Option<u64>,
    pub user_id: Option<u64>,
    pub project_id: Option<u64>,
    /// Observed on or after
    pub d1: Option<String>,
    /// Observed on or before
    pub d2: Option<String>,
    /// Highest rank to count
    pub hrank: Option<String>,
    /// Lowest rank to count
    pub lrank: Option<String>,
    /// Species seen around a location
    pub around: Option<Around>,
    pub quality_grade: Option<QualityGrade>,
    pub per_page: Option<u32>,
}

impl SpeciesCountQuery {
    /// Request descriptor for these filters
    #[must_use]
    pub fn to_request(&self) -> RequestDescriptor {
        let request = RequestDescriptor::get("observations/species_counts")
            .param_opt("place_id", self.place_id)
            .param_opt("taxon_id", self.taxon_id)
            .param_opt("user_id", self.user_id)
            .param_opt("project_id", self.project_id)
            .param_opt("d1", self.d1.as_ref())
            .param_opt("d2", self.d2.as_ref())
            .param_opt("hrank", self.hrank.as_ref())
            .param_opt("lrank", self.lrank.as_ref())
            .param_opt("quality_grade", self.quality_grade.map(QualityGrade::as_str))
            .param_opt("per_page", self.per_page.map(|n| n.min(MAX_PER_PAGE)));

        match self.around {
            Some(around) => around.apply(request),
            None => request,
        }
    }
}

/// Filters shared by `/observations/identifiers` and `/observations/observers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCountQuery {
    pub place_id: Option<u64>,
    pub taxon_id: Option<u64>,
    pub project_id: Option<u64>,
    pub quality_grade: Option<QualityGrade>,
    /// Observed on or after
    pub d1: Option<String>,
    /// Observed on or before
    pub d2: Option<String>,
    pub per_page: Option<u32>,
}

impl UserCountQuery {
    fn to_request(&self, path: &str) -> RequestDescriptor {
        RequestDescriptor::get(path)
            .param_opt("place_id", self.place_id)
            .param_opt("taxon_id", self.taxon_id)
            .param_opt("project_id", self.project_id)
            .param_opt("quality_grade", self.quality_grade.map(QualityGrade::as_str))
            .param_opt("d1", self.d1.as_ref())
            .param_opt("d2", self.d2.as_ref())
            .param_opt("per_page", self.per_page.map(|n| n.min(MAX_PER_PAGE)))
    }
}

/// Bucket width of a histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramInterval {
    Year,
    #[default]
    Month,
    Week,
    Day,
    Hour,
    /// Months folded across years, `1`..`12`
    MonthOfYear,
    /// Weeks folded across years, `1`..`53`
    WeekOfYear,
}

impl HistogramInterval {
    /// Query value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::MonthOfYear => "month_of_year",
            Self::WeekOfYear => "week_of_year",
        }
    }
}

impl fmt::Display for HistogramInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistogramInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "week" => Ok(Self::Week),
            "day" => Ok(Self::Day),
            "hour" => Ok(Self::Hour),
            "month_of_year" => Ok(Self::MonthOfYear),
            "week_of_year" => Ok(Self::WeekOfYear),
            other => Err(format!(
                "unknown histogram interval '{other}' (expected one of: year, month, week, day, hour, month_of_year, week_of_year)"
            )),
        }
    }
}

/// Filters for `GET /observations/histogram`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramQuery {
    pub interval: HistogramInterval,
    pub taxon_id: Option<u64>,
    pub place_id: Option<u64>,
    pub user_id: Option<u64>,
    pub quality_grade: Option<QualityGrade>,
    /// Observed on or after
    pub d1: Option<String>,
    /// Observed on or before
    pub d2: Option<String>,
}

impl HistogramQuery {
    /// Request descriptor for these filters
    #[must_use]
    pub fn to_request(&self) -> RequestDescriptor {
        RequestDescriptor::get("observations/histogram")
            .param("interval", self.interval.as_str())
            .param_opt("taxon_id", self.taxon_id)
            .param_opt("place_id", self.place_id)
            .param_opt("user_id", self.user_id)
            .param_opt("quality_grade", self.quality_grade.map(QualityGrade::as_str))
            .param_opt("d1", self.d1.as_ref())
            .param_opt("d2", self.d2.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::ScriptedTransport;
    use inat_core::clock::ManualClock;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn observations() -> (ObservationsApi, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let config = ClientConfig::default().with_base_url("https://api.example.org/v1");
        let client =
            INatClient::with_transport(config, transport.clone(), Arc::new(ManualClock::new()))
                .unwrap();
        (client.observations(), transport)
    }

    fn sent_query(transport: &ScriptedTransport, call: usize) -> BTreeMap<String, String> {
        transport.requests()[call].query.iter().cloned().collect()
    }

    #[test]
    fn test_search_request_params() {
        let search = ObservationSearch {
            taxon_id: Some(3),
            quality_grade: Some(QualityGrade::NeedsId),
            bounding_box: Some(BoundingBox {
                swlat: 1.0,
                swlng: 2.0,
                nelat: 3.5,
                nelng: 4.0,
            }),
            photos: Some(false),
            per_page: Some(1000),
            ..ObservationSearch::default()
        };

        let params: BTreeMap<String, String> = search.to_request().query_pairs().into_iter().collect();

        assert_eq!(params["taxon_id"], "3");
        assert_eq!(params["quality_grade"], "needs_id");
        assert_eq!(params["swlat"], "1");
        assert_eq!(params["nelat"], "3.5");
        assert_eq!(params["photos"], "false");
        assert_eq!(params["per_page"], "200");
        assert!(!params.contains_key("iconic_taxa"));
        assert!(!params.contains_key("lat"));
    }

    #[test]
    fn test_search_decodes_observations() {
        let (api, transport) = observations();
        transport.push_json(
            200,
            json!({
                "total_results": 1,
                "results": [{
                    "id": 5,
                    "quality_grade": "research",
                    "location": "51.5,-0.12",
                    "taxon": {"id": 9083, "name": "Pica pica"}
                }]
            }),
        );

        let results = api.search(&ObservationSearch::default()).unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].is_research_grade());
        assert_eq!(results[0].coordinates(), Some((51.5, -0.12)));
    }

    #[test]
    fn test_get_not_found_is_none() {
        let (api, transport) = observations();
        transport.push_status(404);

        assert_eq!(api.get(404).unwrap(), None);
        assert_eq!(
            transport.requests()[0].url,
            "https://api.example.org/v1/observations/404"
        );
    }

    #[test]
    fn test_count_requests_zero_items() {
        let (api, transport) = observations();
        transport.push_json(200, json!({"total_results": 42, "page": 1, "per_page": 0, "results": []}));

        let search = ObservationSearch {
            taxon_id: Some(1),
            page: Some(3),
            ..ObservationSearch::default()
        };
        assert_eq!(api.count(&search).unwrap(), 42);

        let query = sent_query(&transport, 0);
        assert_eq!(query["per_page"], "0");
        assert!(!query.contains_key("page"));
    }

    #[test]
    fn test_species_counts_around_location() {
        let (api, transport) = observations();
        transport.push_json(
            200,
            json!({"results": [
                {"count": 12, "taxon": {"id": 9083, "name": "Pica pica"}},
                {"count": 3, "taxon": null}
            ]}),
        );

        let query = SpeciesCountQuery {
            around: Some(Around {
                lat: 39.9,
                lng: 116.4,
                radius: 10.0,
            }),
            hrank: Some("species".into()),
            ..SpeciesCountQuery::default()
        };
        let counts = api.species_counts(&query).unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].count, 12);
        assert_eq!(counts[0].taxon.name, "Pica pica");
        assert_eq!(counts[1].taxon.id, 0);

        let sent = sent_query(&transport, 0);
        assert_eq!(
            transport.requests()[0].url,
            "https://api.example.org/v1/observations/species_counts"
        );
        assert_eq!(sent["lat"], "39.9");
        assert_eq!(sent["radius"], "10");
        assert_eq!(sent["hrank"], "species");
    }

    #[test]
    fn test_latest_preset() {
        let (api, transport) = observations();
        transport.push_json(200, json!({"results": []}));

        api.latest(Some(9083), None, None, PRESET_PAGE_SIZE).unwrap();

        let sent = sent_query(&transport, 0);
        assert_eq!(sent["quality_grade"], "research");
        assert_eq!(sent["photos"], "true");
        assert_eq!(sent["order_by"], "observed_on");
        assert_eq!(sent["order"], "desc");
        assert_eq!(sent["per_page"], "30");
        assert!(!sent.contains_key("place_id"));
    }

    #[test]
    fn test_popular_preset() {
        let (api, transport) = observations();
        transport.push_json(200, json!({"results": []}));

        api.popular(None, Some(6903), 10).unwrap();

        let sent = sent_query(&transport, 0);
        assert_eq!(sent["order_by"], "votes");
        assert_eq!(sent["place_id"], "6903");
        assert!(!sent.contains_key("quality_grade"));
    }

    #[test]
    fn test_search_all_pages() {
        let (api, transport) = observations();
        transport.push_json(200, crate::test_support::page_of_ids(1, 2, 3));
        transport.push_json(200, crate::test_support::page_of_ids(3, 1, 3));

        let all = api
            .search_all(&ObservationSearch::default(), PageOptions::new(2))
            .unwrap();

        assert_eq!(all.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(transport.call_count(), 2);
    }

    #[test]
    fn test_identifiers_and_observers() {
        let (api, transport) = observations();
        transport.push_json(
            200,
            json!({"total_results": 1, "results": [
                {"user_id": 7, "count": 120, "user": {"id": 7, "login": "birder"}}
            ]}),
        );
        transport.push_json(
            200,
            json!({"results": [
                {"user_id": 8, "observation_count": 30, "species_count": 12, "user": {"id": 8, "login": "walker"}}
            ]}),
        );

        let query = UserCountQuery {
            place_id: Some(6903),
            taxon_id: Some(3),
            per_page: Some(500),
            ..UserCountQuery::default()
        };
        let identifiers = api.identifiers(&query).unwrap();
        let observers = api.observers(&query).unwrap();

        assert_eq!(identifiers[0].count, 120);
        assert_eq!(identifiers[0].user.login, "birder");
        assert_eq!(observers[0].species_count, 12);

        let requests = transport.requests();
        assert_eq!(requests[0].url, "https://api.example.org/v1/observations/identifiers");
        assert_eq!(requests[1].url, "https://api.example.org/v1/observations/observers");
        let sent = sent_query(&transport, 1);
        assert_eq!(sent["place_id"], "6903");
        assert_eq!(sent["taxon_id"], "3");
        assert_eq!(sent["per_page"], "200");
    }

    #[test]
    fn test_histogram_interval_and_buckets() {
        let (api, transport) = observations();
        transport.push_json(
            200,
            json!({"total_results": 12, "results": {"month_of_year": {"1": 5, "6": 40, "7": 38}}}),
        );

        let histogram = api
            .histogram(&HistogramQuery {
                interval: HistogramInterval::MonthOfYear,
                taxon_id: Some(9083),
                ..HistogramQuery::default()
            })
            .unwrap();

        assert_eq!(histogram.interval, "month_of_year");
        assert_eq!(histogram.buckets["6"], 40);
        assert_eq!(histogram.total(), 83);

        let sent = sent_query(&transport, 0);
        assert_eq!(
            transport.requests()[0].url,
            "https://api.example.org/v1/observations/histogram"
        );
        assert_eq!(sent["interval"], "month_of_year");
        assert_eq!(sent["taxon_id"], "9083");
    }

    #[test]
    fn test_histogram_defaults_to_month() {
        let request = HistogramQuery::default().to_request();
        let params: BTreeMap<String, String> = request.query_pairs().into_iter().collect();

        assert_eq!(params.len(), 1);
        assert_eq!(params["interval"], "month");
    }

    #[test]
    fn test_histogram_interval_parse() {
        assert_eq!("Week".parse::<HistogramInterval>().unwrap(), HistogramInterval::Week);
        assert_eq!(
            "month_of_year".parse::<HistogramInterval>().unwrap(),
            HistogramInterval::MonthOfYear
        );
        assert!("fortnight".parse::<HistogramInterval>().is_err());
        assert_eq!(HistogramInterval::WeekOfYear.to_string(), "week_of_year");
    }
}
