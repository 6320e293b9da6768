//! Error taxonomy shared by every subsystem.
//!
//! # Design Decisions
//! - Backend failures keep the service's `{code, message}` envelope verbatim
//! - Local failures never carry a backend code
//! - Timeouts and cancellations are their own variants, never folded into
//!   resource-state failures

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error envelope returned in the body of a failed API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error code from the API.
    pub code: i64,
    /// Error message from the API.
    pub message: String,
}

/// Errors produced by the client.
#[derive(Debug, Error)]
pub enum HlbError {
    /// The service rejected the request and explained why.
    #[error("API error {code}: {message} (HTTP {status})")]
    Backend {
        status: u16,
        code: i64,
        message: String,
    },

    /// The service rejected the request without a parseable error body.
    #[error("API request failed with HTTP {status}")]
    Http { status: u16 },

    /// The request never produced a response.
    #[error("failed to send request: {0}")]
    Network(#[source] reqwest::Error),

    /// A request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Signed header generation failed (role assumption, presigning, URL parsing).
    #[error("failed to generate API credentials: {0}")]
    Credentials(String),

    /// The credential store could not be written.
    #[error("credential store error at {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A local precondition failed (missing API key, bad endpoint, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// The resource reported the `failed` state.
    #[error("{kind} ({id}) entered failed state, with message '{message}'")]
    ResourceFailed {
        kind: &'static str,
        id: String,
        message: String,
    },

    /// The resource reported a state outside the expected progression.
    #[error("{kind} ({id}) entered unexpected state {state}")]
    UnexpectedState {
        kind: &'static str,
        id: String,
        state: String,
    },

    /// The resource did not converge before the deadline.
    #[error("timed out after {timeout:?} waiting for {kind} ({id}) to reach {target}, last observed state {last_state}")]
    Timeout {
        kind: &'static str,
        id: String,
        target: String,
        last_state: String,
        timeout: Duration,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

/// Coarse classification of an [`HlbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected by the remote service.
    Backend,
    /// Failed locally: network, serialization, credentials, configuration.
    Local,
    /// The resource reached `failed` or an unknown state.
    ResourceState,
    /// Reconciliation exceeded its window.
    Timeout,
    /// Caller-requested cancellation.
    Cancelled,
}

/// Where an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// An HTTP response with this status.
    Remote(u16),
    /// This library.
    Library,
}

impl HlbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HlbError::Backend { .. } | HlbError::Http { .. } => ErrorKind::Backend,
            HlbError::Network(_)
            | HlbError::Serialization(_)
            | HlbError::Credentials(_)
            | HlbError::Store { .. }
            | HlbError::Config(_) => ErrorKind::Local,
            HlbError::ResourceFailed { .. } | HlbError::UnexpectedState { .. } => {
                ErrorKind::ResourceState
            }
            HlbError::Timeout { .. } => ErrorKind::Timeout,
            HlbError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn origin(&self) -> ErrorOrigin {
        match self {
            HlbError::Backend { status, .. } | HlbError::Http { status } => {
                ErrorOrigin::Remote(*status)
            }
            _ => ErrorOrigin::Library,
        }
    }

    /// HTTP status of a backend rejection.
    pub fn status(&self) -> Option<u16> {
        match self.origin() {
            ErrorOrigin::Remote(status) => Some(status),
            ErrorOrigin::Library => None,
        }
    }

    /// Backend-supplied error envelope, if any.
    pub fn api_response(&self) -> Option<ApiErrorResponse> {
        match self {
            HlbError::Backend { code, message, .. } => Some(ApiErrorResponse {
                code: *code,
                message: message.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HlbError::Timeout { .. })
    }
}

/// Result type for client operations.
pub type HlbResult<T> = Result<T, HlbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_keeps_envelope() {
        let err = HlbError::Backend {
            status: 400,
            code: 1042,
            message: "invalid subnet".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.origin(), ErrorOrigin::Remote(400));
        assert_eq!(
            err.api_response(),
            Some(ApiErrorResponse {
                code: 1042,
                message: "invalid subnet".into()
            })
        );
        assert!(err.to_string().contains("invalid subnet"));
    }

    #[test]
    fn test_local_errors_have_library_origin() {
        let err = HlbError::Credentials("failed to assume role".into());
        assert_eq!(err.kind(), ErrorKind::Local);
        assert_eq!(err.origin(), ErrorOrigin::Library);
        assert_eq!(err.status(), None);
        assert!(err.api_response().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = HlbError::Http { status: 502 };
        assert_eq!(err.to_string(), "API request failed with HTTP 502");

        let err = HlbError::ResourceFailed {
            kind: "load balancer",
            id: "lb-1".into(),
            message: "quota exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "load balancer (lb-1) entered failed state, with message 'quota exceeded'"
        );
    }

    #[test]
    fn test_timeout_is_distinct_from_state_failure() {
        let err = HlbError::Timeout {
            kind: "load balancer",
            id: "lb-1".into(),
            target: "[active]".into(),
            last_state: "updating".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(err.is_timeout());
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
