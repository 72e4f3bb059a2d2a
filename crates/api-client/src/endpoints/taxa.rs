//! Taxa API endpoints
//!
//! Maps to `/taxa` and `/taxa/autocomplete`:
//! - Search taxa by name, rank, parent or iconic group
//! - Get a single taxon by ID
//! - Walk children and ancestors

use crate::client::INatClient;
use crate::endpoints::observations::ObservationSearch;
use crate::error::ApiResult;
use crate::models::{Observation, Page, QualityGrade, Taxon};
use crate::pagination::{PageOptions, MAX_PER_PAGE};
use crate::request::RequestDescriptor;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Results considered when matching a scientific name
const NAME_MATCH_CANDIDATES: u32 = 5;

/// Page size for the kingdom listing
const ICONIC_PAGE_SIZE: u32 = 50;

/// Taxa API interface
#[derive(Clone)]
pub struct TaxaApi {
    client: INatClient,
}

impl TaxaApi {
    /// Create a new taxa API interface
    pub(crate) fn new(client: INatClient) -> Self {
        Self { client }
    }

    /// Search taxa
    ///
    /// GET /taxa
    #[instrument(skip(self))]
    pub fn search(&self, search: &TaxonSearch) -> ApiResult<Vec<Taxon>> {
        let page: Page<Taxon> = self.client.get(&search.to_request())?;
        Ok(page.results)
    }

    /// Search taxa across every page
    pub fn search_all(&self, search: &TaxonSearch, options: PageOptions) -> ApiResult<Vec<Taxon>> {
        self.client.paginator().collect(&search.to_request(), options)
    }

    /// Name completion, tolerant of partial words
    ///
    /// GET /taxa/autocomplete
    #[instrument(skip(self))]
    pub fn autocomplete(&self, q: &str, per_page: u32) -> ApiResult<Vec<Taxon>> {
        let request = RequestDescriptor::get("taxa/autocomplete")
            .param("q", q)
            .param("per_page", per_page.clamp(1, MAX_PER_PAGE));
        let page: Page<Taxon> = self.client.get(&request)?;
        Ok(page.results)
    }

    /// Get a single taxon by ID
    ///
    /// GET /taxa/{id}. A 404 or an empty result is `None`.
    #[instrument(skip(self))]
    pub fn get(&self, id: u64) -> ApiResult<Option<Taxon>> {
        match self.client.get::<Page<Taxon>>(&RequestDescriptor::get(format!("taxa/{id}"))) {
            Ok(page) => Ok(page.results.into_iter().next()),
            Err(e) if e.is_not_found() => {
                debug!(id, "Taxon not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Taxon whose scientific name matches `name`, ignoring case
    ///
    /// Falls back to the best search hit when nothing matches exactly.
    pub fn by_name(&self, name: &str) -> ApiResult<Option<Taxon>> {
        let search = TaxonSearch {
            q: Some(name.to_string()),
            per_page: Some(NAME_MATCH_CANDIDATES),
            ..TaxonSearch::default()
        };
        let results = self.search(&search)?;

        let exact = results
            .iter()
            .position(|taxon| taxon.name.eq_ignore_ascii_case(name));
        Ok(match exact {
            Some(index) => results.into_iter().nth(index),
            None => results.into_iter().next(),
        })
    }

    /// Direct children of `parent_id`, optionally limited to one rank
    pub fn children(&self, parent_id: u64, rank: Option<&str>) -> ApiResult<Vec<Taxon>> {
        let search = TaxonSearch {
            parent_id: Some(parent_id),
            rank: rank.map(str::to_string),
            per_page: Some(MAX_PER_PAGE),
            ..TaxonSearch::default()
        };
        self.search(&search)
    }

    /// Lineage of `id`, root first, without the taxon itself
    ///
    /// Ancestors that no longer resolve are skipped.
    #[instrument(skip(self))]
    pub fn ancestors(&self, id: u64) -> ApiResult<Vec<Taxon>> {
        let Some(taxon) = self.get(id)? else {
            return Ok(Vec::new());
        };

        let mut ancestors = Vec::new();
        for ancestor_id in taxon.strict_ancestor_ids() {
            if let Some(ancestor) = self.get(ancestor_id)? {
                ancestors.push(ancestor);
            }
        }
        Ok(ancestors)
    }

    /// Kingdom-level taxa
    pub fn iconic(&self) -> ApiResult<Vec<Taxon>> {
        let search = TaxonSearch {
            rank: Some("kingdom".to_string()),
            per_page: Some(ICONIC_PAGE_SIZE),
            ..TaxonSearch::default()
        };
        self.search(&search)
    }

    /// Number of observations of a taxon
    pub fn observation_count(
        &self,
        taxon_id: u64,
        place_id: Option<u64>,
        quality_grade: Option<QualityGrade>,
    ) -> ApiResult<u64> {
        let search = ObservationSearch {
            taxon_id: Some(taxon_id),
            place_id,
            quality_grade,
            ..ObservationSearch::default()
        };
        self.client.observations().count(&search)
    }

    /// Observations of a taxon across pages
    ///
    /// `photos_only` adds `photos=true`; otherwise the filter is left off.
    pub fn observations(
        &self,
        taxon_id: u64,
        quality_grade: Option<QualityGrade>,
        photos_only: bool,
        options: PageOptions,
    ) -> ApiResult<Vec<Observation>> {
        let search = ObservationSearch {
            taxon_id: Some(taxon_id),
            quality_grade,
            photos: photos_only.then_some(true),
            ..ObservationSearch::default()
        };
        self.client.observations().search_all(&search, options)
    }
}

/// Filters for `GET /taxa`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonSearch {
    /// Name query
    pub q: Option<String>,
    /// Restrict to these taxon IDs
    pub id: Vec<u64>,
    /// Restrict to children of this taxon
    pub parent_id: Option<u64>,
    /// Exact rank, e.g. `species`
    pub rank: Option<String>,
    /// Lowest rank to include
    pub min_rank: Option<String>,
    /// Highest rank to include
    pub max_rank: Option<String>,
    /// Iconic groups, e.g. `Aves`
    pub iconic_taxa: Vec<String>,
    /// Active taxa only
    pub is_active: Option<bool>,
    /// Page size, at most 200
    pub per_page: Option<u32>,
    /// 1-based page number
    pub page: Option<u32>,
}

impl TaxonSearch {
    /// Search by name
    #[must_use]
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    /// Request descriptor for these filters
    #[must_use]
    pub fn to_request(&self) -> RequestDescriptor {
        let ids = (!self.id.is_empty()).then(|| self.id.clone());
        RequestDescriptor::get("taxa")
            .param_opt("q", self.q.as_ref())
            .param_opt("id", ids)
            .param_opt("parent_id", self.parent_id)
            .param_opt("rank", self.rank.as_ref())
            .param_opt("min_rank", self.min_rank.as_ref())
            .param_opt("max_rank", self.max_rank.as_ref())
            .param_opt("iconic_taxa", Some(self.iconic_taxa.clone()))
            .param_opt("is_active", self.is_active)
            .param_opt("per_page", self.per_page.map(|n| n.min(MAX_PER_PAGE)))
            .param_opt("page", self.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_support::ScriptedTransport;
    use inat_core::clock::ManualClock;
    use serde_json::json;
    use std::sync::Arc;

    fn taxa() -> (TaxaApi, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let config = ClientConfig::default().with_base_url("https://api.example.org/v1");
        let client =
            INatClient::with_transport(config, transport.clone(), Arc::new(ManualClock::new()))
                .unwrap();
        (client.taxa(), transport)
    }

    fn taxon(id: u64, name: &str) -> serde_json::Value {
        json!({"id": id, "name": name, "rank": "species", "rank_level": 10})
    }

    fn query_value(transport: &ScriptedTransport, call: usize, key: &str) -> Option<String> {
        transport.requests()[call]
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    #[test]
    fn test_search_request_params() {
        let search = TaxonSearch {
            q: Some("magpie".into()),
            id: vec![1, 2],
            iconic_taxa: vec!["Aves".into(), "Mammalia".into()],
            is_active: Some(true),
            per_page: Some(500),
            ..TaxonSearch::default()
        };

        let pairs = search.to_request().query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("iconic_taxa".to_string(), "Aves,Mammalia".to_string()),
                ("id".to_string(), "1,2".to_string()),
                ("is_active".to_string(), "true".to_string()),
                ("per_page".to_string(), "200".to_string()),
                ("q".to_string(), "magpie".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_decodes_results() {
        let (api, transport) = taxa();
        transport.push_json(200, json!({"total_results": 1, "results": [taxon(9083, "Pica pica")]}));

        let results = api.search(&TaxonSearch::query("Pica")).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Pica pica");
        assert_eq!(transport.requests()[0].url, "https://api.example.org/v1/taxa");
    }

    #[test]
    fn test_get_not_found_is_none() {
        let (api, transport) = taxa();
        transport.push_status(404);
        transport.push_json(200, json!({"results": []}));

        assert_eq!(api.get(1).unwrap(), None);
        assert_eq!(api.get(2).unwrap(), None);
        assert_eq!(transport.call_count(), 2);
    }

    #[test]
    fn test_get_propagates_other_errors() {
        let (api, transport) = taxa();
        transport.push_status(401);

        assert!(api.get(1).is_err());
    }

    #[test]
    fn test_by_name_prefers_exact_match() {
        let (api, transport) = taxa();
        transport.push_json(
            200,
            json!({"results": [taxon(1, "Pica pica sericea"), taxon(9083, "Pica pica")]}),
        );

        let found = api.by_name("pica PICA").unwrap().unwrap();

        assert_eq!(found.id, 9083);
        assert_eq!(query_value(&transport, 0, "per_page").as_deref(), Some("5"));
    }

    #[test]
    fn test_by_name_falls_back_to_first() {
        let (api, transport) = taxa();
        transport.push_json(200, json!({"results": [taxon(7, "Pica hudsonia")]}));

        assert_eq!(api.by_name("Pica").unwrap().unwrap().id, 7);
    }

    #[test]
    fn test_ancestors_skip_self_and_missing() {
        let (api, transport) = taxa();
        transport.push_json(
            200,
            json!({"results": [{"id": 9083, "name": "Pica pica", "ancestor_ids": [48460, 1, 9083]}]}),
        );
        transport.push_json(200, json!({"results": [taxon(48460, "Life")]}));
        transport.push_status(404);

        let ancestors = api.ancestors(9083).unwrap();

        assert_eq!(ancestors.len(), 1);
        assert_eq!(ancestors[0].id, 48460);
        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.requests()[2].url, "https://api.example.org/v1/taxa/1");
    }

    #[test]
    fn test_children_and_iconic_params() {
        let (api, transport) = taxa();
        transport.push_json(200, json!({"results": []}));
        transport.push_json(200, json!({"results": []}));

        api.children(3, Some("genus")).unwrap();
        api.iconic().unwrap();

        assert_eq!(query_value(&transport, 0, "parent_id").as_deref(), Some("3"));
        assert_eq!(query_value(&transport, 0, "rank").as_deref(), Some("genus"));
        assert_eq!(query_value(&transport, 0, "per_page").as_deref(), Some("200"));
        assert_eq!(query_value(&transport, 1, "rank").as_deref(), Some("kingdom"));
        assert_eq!(query_value(&transport, 1, "per_page").as_deref(), Some("50"));
    }

    #[test]
    fn test_observation_count_uses_zero_page() {
        let (api, transport) = taxa();
        transport.push_json(200, json!({"total_results": 1234, "results": []}));

        let count = api
            .observation_count(9083, Some(97394), Some(QualityGrade::Research))
            .unwrap();

        assert_eq!(count, 1234);
        assert_eq!(transport.requests()[0].url, "https://api.example.org/v1/observations");
        assert_eq!(query_value(&transport, 0, "per_page").as_deref(), Some("0"));
        assert_eq!(query_value(&transport, 0, "quality_grade").as_deref(), Some("research"));
    }

    #[test]
    fn test_observations_of_taxon() {
        let (api, transport) = taxa();
        transport.push_json(200, crate::test_support::page_of_ids(1, 2, 5));
        transport.push_json(200, crate::test_support::page_of_ids(3, 2, 5));

        let observations = api
            .observations(
                9083,
                Some(QualityGrade::Research),
                true,
                PageOptions::new(2).with_max_results(3),
            )
            .unwrap();

        assert_eq!(observations.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.requests()[0].url, "https://api.example.org/v1/observations");
        assert_eq!(query_value(&transport, 0, "taxon_id").as_deref(), Some("9083"));
        assert_eq!(query_value(&transport, 0, "photos").as_deref(), Some("true"));
        assert_eq!(query_value(&transport, 1, "page").as_deref(), Some("2"));
    }

    #[test]
    fn test_observations_without_photo_filter() {
        let (api, transport) = taxa();
        transport.push_json(200, json!({"results": []}));

        let observations = api.observations(3, None, false, PageOptions::default()).unwrap();

        assert!(observations.is_empty());
        assert_eq!(query_value(&transport, 0, "photos"), None);
        assert_eq!(query_value(&transport, 0, "quality_grade"), None);
        assert_eq!(query_value(&transport, 0, "per_page").as_deref(), Some("200"));
    }
}
