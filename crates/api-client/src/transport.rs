//! One-round-trip HTTP transport
//!
//! [`Transport`] is the seam between request classification and the
//! network. [`ReqwestTransport`] is the production implementation; tests
//! substitute a scripted one.

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

/// Request correlation ID header
pub const X_REQUEST_ID: &str = "X-Request-ID";

/// What the request is for; decides which headers are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPurpose {
    /// JSON API call: `Accept: application/json` and bearer token
    Api,
    /// Plain binary download from a media host
    Binary,
}

/// A fully resolved HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    /// Query pairs appended to the URL
    pub query: Vec<(String, String)>,
    /// JSON body
    pub body: Option<Value>,
    /// Correlation ID sent as `X-Request-ID`
    pub request_id: String,
    /// Header profile
    pub purpose: RequestPurpose,
}

/// Raw response as seen by the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// `Content-Type` header
    pub content_type: Option<String>,
    /// `Content-Length` header
    pub content_length: Option<u64>,
    /// Body bytes; empty for HEAD
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// JSON response
    #[must_use]
    pub fn json(status: u16, value: &Value) -> Self {
        let body = value.to_string().into_bytes();
        Self {
            status,
            content_type: Some("application/json".to_string()),
            content_length: Some(body.len() as u64),
            body,
        }
    }

    /// Response with an arbitrary body
    #[must_use]
    pub fn bytes(status: u16, body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        let body = body.into();
        Self {
            status,
            content_type: content_type.map(str::to_string),
            content_length: Some(body.len() as u64),
            body,
        }
    }

    /// Body decoded as lossy UTF-8
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network-level failure before any status was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Could not connect
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other network error
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Exactly one network round-trip
pub trait Transport: Send + Sync {
    /// Send `request` and return whatever status came back
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking `reqwest` transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: Client,
    api_key: Option<String>,
}

impl ReqwestTransport {
    /// Build a transport with the configured timeout and default headers
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|_| ApiError::config("user_agent is not a valid header value"))?,
        );

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            api_key: config.api_key.clone(),
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .inner
            .request(request.method.clone(), &request.url)
            .header(X_REQUEST_ID, &request.request_id);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if request.purpose == RequestPurpose::Api {
            builder = builder.header(ACCEPT, "application/json");
            if let Some(ref key) = self.api_key {
                builder = builder.bearer_auth(key);
            }
        }

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let content_type = header_str(&response, &CONTENT_TYPE);
        let content_length = header_str(&response, &CONTENT_LENGTH).and_then(|v| v.parse().ok());
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status,
            content_type,
            content_length,
            body,
        })
    }
}

fn header_str(response: &Response, name: &HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_builds_from_default_config() {
        assert!(ReqwestTransport::new(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_user_agent_rejected() {
        let config = ClientConfig::default().with_user_agent("bad\nagent");
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(ApiError::Config(_))
        ));
    }

    #[test]
    fn test_json_response_helper() {
        let response = HttpResponse::json(200, &json!({"total_results": 1}));
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(response.text(), r#"{"total_results":1}"#);
    }
}
