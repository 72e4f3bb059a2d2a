//! Single-attempt request execution and status classification
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 2xx | decoded JSON (empty body → `{}`) |
//! | 2xx, bad JSON | `MalformedResponse` |
//! | 429 | `RateLimitExceeded` |
//! | 401, 403 | `AuthenticationFailed` |
//! | 5xx, timeout, connection error | `TransientServerError` |
//! | anything else | `RequestRejected` |

use crate::error::{ApiError, ApiResult};
use crate::request::{join_url, normalize_base_url, RequestDescriptor};
use crate::transport::{HttpRequest, HttpResponse, RequestPurpose, Transport};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Bytes fetched from a media URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Body bytes
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the server
    pub content_type: Option<String>,
}

/// Headers of a remote resource, from a HEAD request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    /// Requested URL
    pub url: String,
    /// `Content-Length`, when reported
    pub size_bytes: Option<u64>,
    /// `Content-Type`, when reported
    pub content_type: Option<String>,
}

/// Issues exactly one HTTP call per invocation and classifies the outcome
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl Executor {
    /// Create an executor; `base_url` is normalized here and nowhere else
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: normalize_base_url(base_url),
        }
    }

    /// Normalized API root
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Perform one API call and decode its JSON body
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub fn execute(&self, request: &RequestDescriptor) -> ApiResult<Value> {
        let http = HttpRequest {
            method: request.method.clone(),
            url: self.url_for(&request.path),
            query: request.query_pairs(),
            body: request.body.clone(),
            request_id: Uuid::new_v4().to_string(),
            purpose: RequestPurpose::Api,
        };

        let response = self.round_trip(&http)?;
        decode_json(&response.body)
    }

    /// Plain binary GET of an absolute URL
    #[instrument(skip(self))]
    pub fn fetch_bytes(&self, url: &str) -> ApiResult<Download> {
        let response = self.round_trip(&binary_request(Method::GET, url))?;
        Ok(Download {
            bytes: response.body,
            content_type: response.content_type,
        })
    }

    /// HEAD an absolute URL for its size and type
    #[instrument(skip(self))]
    pub fn head(&self, url: &str) -> ApiResult<ResourceInfo> {
        let response = self.round_trip(&binary_request(Method::HEAD, url))?;
        Ok(ResourceInfo {
            url: url.to_string(),
            size_bytes: response.content_length,
            content_type: response.content_type,
        })
    }

    fn round_trip(&self, request: &HttpRequest) -> ApiResult<HttpResponse> {
        debug!(
            request_id = %request.request_id,
            url = %request.url,
            "Sending request"
        );

        let response = self.transport.send(request).map_err(|e| {
            debug!(request_id = %request.request_id, error = %e, "Transport failure");
            ApiError::from(e)
        })?;

        debug!(
            request_id = %request.request_id,
            status = response.status,
            bytes = response.body.len(),
            "Received response"
        );

        check_status(&response)?;
        Ok(response)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn binary_request(method: Method, url: &str) -> HttpRequest {
    HttpRequest {
        method,
        url: url.to_string(),
        query: Vec::new(),
        body: None,
        request_id: Uuid::new_v4().to_string(),
        purpose: RequestPurpose::Binary,
    }
}

/// Map a non-success status to its failure kind
pub fn check_status(response: &HttpResponse) -> ApiResult<()> {
    match response.status {
        200..=299 => Ok(()),
        429 => Err(ApiError::RateLimitExceeded),
        401 | 403 => Err(ApiError::AuthenticationFailed {
            status: response.status,
        }),
        500..=599 => Err(ApiError::TransientServerError {
            status: Some(response.status),
            message: response.text(),
        }),
        status => Err(ApiError::RequestRejected {
            status,
            body: response.text(),
        }),
    }
}

/// Decode a success body; blank bodies decode to an empty object
pub fn decode_json(body: &[u8]) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}
