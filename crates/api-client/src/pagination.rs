//! Page-by-page collection of list endpoints
//!
//! Pages are requested from 1 upwards through the retrying client. After
//! each page the driver stops when:
//! - the page was empty
//! - the page was short (fewer items than `per_page`)
//! - `max_pages` pages have been fetched
//! - `max_results` items have been collected (the result is truncated)
//!
//! A failure on any page aborts the whole collection.

use crate::client::INatClient;
use crate::error::ApiResult;
use crate::models::Page;
use crate::request::RequestDescriptor;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Largest page size the API accepts
pub const MAX_PER_PAGE: u32 = 200;

/// Limits for a paginated collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Items per page, clamped into `1..=200`
    pub per_page: u32,
    /// Stop after this many pages
    pub max_pages: Option<u32>,
    /// Stop once this many items are collected
    pub max_results: Option<usize>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            per_page: MAX_PER_PAGE,
            max_pages: None,
            max_results: None,
        }
    }
}

impl PageOptions {
    /// Options with the given page size and no caps
    #[must_use]
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page,
            ..Self::default()
        }
    }

    /// Cap the number of pages fetched
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Cap the number of items returned
    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Page size actually requested
    #[must_use]
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

/// Drives a list endpoint across pages
#[derive(Debug, Clone, Copy)]
pub struct Paginator<'a> {
    client: &'a INatClient,
}

impl<'a> Paginator<'a> {
    /// Paginate through `client`
    #[must_use]
    pub fn new(client: &'a INatClient) -> Self {
        Self { client }
    }

    /// Collect every item of `template`'s endpoint, in fetch order
    ///
    /// `page` and `per_page` in the template are overwritten.
    pub fn collect<T: DeserializeOwned>(
        &self,
        template: &RequestDescriptor,
        options: PageOptions,
    ) -> ApiResult<Vec<T>> {
        collect_pages(options, |page, per_page| {
            let mut request = template.clone();
            request.set_param("page", page);
            request.set_param("per_page", per_page);
            let response: Page<T> = self.client.get(&request)?;
            Ok(response.results)
        })
    }
}

/// Pagination loop over an arbitrary page fetcher
///
/// `fetch` receives the 1-based page number and the page size.
pub fn collect_pages<T, F>(options: PageOptions, mut fetch: F) -> ApiResult<Vec<T>>
where
    F: FnMut(u32, u32) -> ApiResult<Vec<T>>,
{
    let per_page = options.effective_per_page();
    let mut collected = Vec::new();
    let mut page = 1;

    loop {
        let items = fetch(page, per_page)?;
        let received = items.len();
        collected.extend(items);

        debug!(page, received, total = collected.len(), "Fetched page");

        if let Some(max_results) = options.max_results {
            if collected.len() >= max_results {
                collected.truncate(max_results);
                break;
            }
        }

        if received == 0 || received < per_page as usize {
            break;
        }

        if options.max_pages.is_some_and(|max| page >= max) {
            break;
        }

        page += 1;
    }

    Ok(collected)
}
