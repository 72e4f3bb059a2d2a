//! Error types for the API client

use crate::transport::TransportError;
use inat_core::retry::{RetryError, Retryable};
use std::fmt;
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// The closed set of request failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 401 or 403
    AuthenticationFailed,
    /// 429
    RateLimitExceeded,
    /// 5xx, timeout or connection failure
    TransientServerError,
    /// Any other non-success status
    RequestRejected,
    /// Success status with an undecodable body
    MalformedResponse,
}

impl ErrorKind {
    /// Whether a failure of this kind may succeed on a later attempt
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::TransientServerError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AuthenticationFailed => "authentication failed",
            Self::RateLimitExceeded => "rate limit exceeded",
            Self::TransientServerError => "transient server error",
            Self::RequestRejected => "request rejected",
            Self::MalformedResponse => "malformed response",
        };
        f.write_str(name)
    }
}

/// API client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Credentials missing or refused
    #[error("Authentication failed ({status})")]
    AuthenticationFailed {
        /// HTTP status code
        status: u16,
    },

    /// The server asked us to slow down
    #[error("Rate limit exceeded (429)")]
    RateLimitExceeded,

    /// Server-side or network failure that may clear up
    #[error("Transient server error{}: {message}", fmt_status(.status))]
    TransientServerError {
        /// HTTP status code, absent for network failures
        status: Option<u16>,
        /// Response body or network error description
        message: String,
    },

    /// The server refused the request
    #[error("Request rejected ({status}): {body}")]
    RequestRejected {
        /// HTTP status code
        status: u16,
        /// Response body for diagnostics
        body: String,
    },

    /// A success response whose body could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Every attempt failed with a retryable error
    #[error("Request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Most recent failure
        source: Box<ApiError>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local image cache failure
    #[error("Cache error: {0}")]
    Cache(#[from] inat_core::Error),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transient error from a network failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::TransientServerError {
            status: None,
            message: message.into(),
        }
    }

    /// Failure kind, looking through exhausted retries to the last failure
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::AuthenticationFailed { .. } => Some(ErrorKind::AuthenticationFailed),
            Self::RateLimitExceeded => Some(ErrorKind::RateLimitExceeded),
            Self::TransientServerError { .. } => Some(ErrorKind::TransientServerError),
            Self::RequestRejected { .. } => Some(ErrorKind::RequestRejected),
            Self::MalformedResponse(_) => Some(ErrorKind::MalformedResponse),
            Self::RetriesExhausted { source, .. } => source.kind(),
            Self::Config(_) | Self::Cache(_) => None,
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded | Self::TransientServerError { .. } => true,
            Self::AuthenticationFailed { .. }
            | Self::RequestRejected { .. }
            | Self::MalformedResponse(_)
            | Self::RetriesExhausted { .. }
            | Self::Config(_)
            | Self::Cache(_) => false,
        }
    }

    /// HTTP status associated with the failure, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { status } | Self::RequestRejected { status, .. } => {
                Some(*status)
            }
            Self::RateLimitExceeded => Some(429),
            Self::TransientServerError { status, .. } => *status,
            Self::RetriesExhausted { source, .. } => source.status(),
            Self::MalformedResponse(_) | Self::Config(_) | Self::Cache(_) => None,
        }
    }

    /// Attempts made before giving up, for exhausted retries
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Check if the server answered 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        ApiError::is_retryable(self)
    }
}

impl From<RetryError<ApiError>> for ApiError {
    fn from(err: RetryError<ApiError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => Self::RetriesExhausted {
                attempts,
                source: Box::new(last),
            },
            RetryError::Fatal(e) => e,
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self::network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ApiError::RateLimitExceeded.is_retryable());
        assert!(ApiError::network("connection reset").is_retryable());
        assert!(!ApiError::AuthenticationFailed { status: 401 }.is_retryable());
        assert!(!ApiError::RequestRejected {
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!ApiError::MalformedResponse("eof".into()).is_retryable());
    }

    #[test]
    fn test_exhausted_reports_last_failure() {
        let err: ApiError = RetryError::Exhausted {
            attempts: 3,
            last: ApiError::TransientServerError {
                status: Some(503),
                message: "unavailable".into(),
            },
        }
        .into();

        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.kind(), Some(ErrorKind::TransientServerError));
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Request failed after 3 attempts: Transient server error (503): unavailable"
        );
    }

    #[test]
    fn test_fatal_passes_through() {
        let err: ApiError = RetryError::Fatal(ApiError::AuthenticationFailed { status: 403 }).into();
        assert!(matches!(err, ApiError::AuthenticationFailed { status: 403 }));
    }

    #[test]
    fn test_network_error_display() {
        let err: ApiError = TransportError::Timeout("after 30s".into()).into();
        assert_eq!(err.kind(), Some(ErrorKind::TransientServerError));
        assert_eq!(err.status(), None);
        assert!(err.to_string().starts_with("Transient server error: "));
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::RequestRejected {
            status: 404,
            body: "{}".into(),
        };
        assert!(err.is_not_found());
        assert!(!ApiError::RateLimitExceeded.is_not_found());
    }
}
