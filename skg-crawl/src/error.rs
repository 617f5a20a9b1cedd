//! Error types for skg-crawl
//!
//! `FailureKind` is the classification every request attempt and parse step
//! reports. The enums below it are what actually crosses function boundaries:
//! retryable kinds never leave the request client, terminal ones surface as
//! `RequestFailure`, and adapters turn those into empty result sets.

use std::fmt;
use thiserror::Error;

/// Failure classification for one request attempt or parse step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, connection refused/reset, body read interrupted
    TransientNetwork,
    /// HTTP 429
    RateLimited,
    /// Any other non-2xx status
    ServerError,
    /// HTTP 404, terminal
    NotFound,
    /// 2xx with an empty body, retried like a transient failure
    EmptyResponse,
    /// Malformed payload or missing mandatory field
    ParseFailure,
    /// Backoff budget consumed without a success
    RetriesExhausted,
}

impl FailureKind {
    /// Whether the request client retries this kind locally
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::TransientNetwork
                | FailureKind::RateLimited
                | FailureKind::ServerError
                | FailureKind::EmptyResponse
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::TransientNetwork => "transient-network",
            FailureKind::RateLimited => "rate-limited",
            FailureKind::ServerError => "server-error",
            FailureKind::NotFound => "not-found",
            FailureKind::EmptyResponse => "empty-response",
            FailureKind::ParseFailure => "parse-failure",
            FailureKind::RetriesExhausted => "retries-exhausted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one logical request
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Upstream answered 404; never retried
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// Every attempt failed with a retryable kind
    #[error("Retries exhausted after {attempts} attempts (last failure: {last:?})")]
    RetriesExhausted {
        attempts: u32,
        last: Option<FailureKind>,
    },

    /// The request could not even be built (bad URL, bad header)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RequestFailure {
    /// Taxonomy kind, if this failure belongs to it
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            RequestFailure::NotFound { .. } => Some(FailureKind::NotFound),
            RequestFailure::RetriesExhausted { .. } => Some(FailureKind::RetriesExhausted),
            RequestFailure::InvalidRequest(_) => None,
        }
    }
}

/// Whole-payload parse failure
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed XML: {0}")]
    Xml(String),
}

/// Unexpected adapter failure; the orchestrator downgrades it to an empty set
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Request failed: {0}")]
    Request(#[from] RequestFailure),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Output sink failure for one entity
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Identifier {0:?} cannot be used as a file name")]
    InvalidFileName(String),

    #[error("Record fields {found:?} do not match header {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
