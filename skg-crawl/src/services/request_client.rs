//! Resilient request client
//!
//! One logical GET = a bounded loop of attempts. Each attempt is reduced to
//! an [`Attempt`] tag; the loop alone decides whether to stop, return, or
//! back off. Backoff for attempt `a` is `unit × min(2^a, cap)` with
//! cap = 30 for generic failures and 60 for HTTP 429.
//!
//! **Algorithm:**
//! 1. Take a pacing permit (if a pacer is attached)
//! 2. Send the GET with the per-call timeout
//! 3. 2xx with a body → return payload
//! 4. 404 → return `NotFound` immediately
//! 5. 429 / other non-2xx / transport error / empty body → sleep, next attempt
//! 6. Out of attempts → `RetriesExhausted`

use crate::error::{AcquireError, FailureKind, RequestFailure};
use crate::services::rate_limiter::RequestPacer;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff cap (in units) for transport, server and empty-body failures
pub const GENERIC_BACKOFF_CAP: u64 = 30;

/// Backoff cap (in units) for explicit rate limiting
pub const RATE_LIMIT_BACKOFF_CAP: u64 = 60;

/// `min(2^attempt, cap)`, saturating for large attempt indices
pub fn backoff_units(attempt: u32, cap: u64) -> u64 {
    2u64.checked_pow(attempt).unwrap_or(u64::MAX).min(cap)
}

/// Maps attempt index + failure kind to a sleep duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Duration of one backoff unit (1 s in production)
    pub unit: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
        }
    }
}

impl BackoffPolicy {
    pub fn with_unit(unit: Duration) -> Self {
        Self { unit }
    }

    pub fn wait(&self, kind: FailureKind, attempt: u32) -> Duration {
        let cap = match kind {
            FailureKind::RateLimited => RATE_LIMIT_BACKOFF_CAP,
            _ => GENERIC_BACKOFF_CAP,
        };
        // Capped at 60, fits u32
        self.unit * backoff_units(attempt, cap) as u32
    }
}

/// Tagged outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    Transient(String),
    RateLimited,
    ServerError(u16),
    EmptyResponse,
    NotFound,
    /// Request could not be built; retrying cannot help
    Invalid(String),
}

impl<T> Attempt<T> {
    /// Taxonomy kind for failed attempts
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Attempt::Success(_) | Attempt::Invalid(_) => None,
            Attempt::Transient(_) => Some(FailureKind::TransientNetwork),
            Attempt::RateLimited => Some(FailureKind::RateLimited),
            Attempt::ServerError(_) => Some(FailureKind::ServerError),
            Attempt::EmptyResponse => Some(FailureKind::EmptyResponse),
            Attempt::NotFound => Some(FailureKind::NotFound),
        }
    }
}

/// Drive `attempt_fn` through the retry state machine
///
/// # Arguments
/// * `label` - Name for logging (usually the URL)
/// * `max_retries` - Total attempt budget; 0 means no attempt at all
/// * `policy` - Backoff unit
/// * `attempt_fn` - Performs attempt `a` and classifies it
///
/// No sleep follows the final attempt.
pub async fn run_with_backoff<T, F, Fut>(
    label: &str,
    max_retries: u32,
    policy: &BackoffPolicy,
    mut attempt_fn: F,
) -> Result<T, RequestFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let mut last = None;

    for attempt in 0..max_retries {
        debug!(target_url = label, attempt, "Request attempt");

        let outcome = attempt_fn(attempt).await;
        let kind = match outcome {
            Attempt::Success(value) => {
                if attempt > 0 {
                    debug!(target_url = label, attempt, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Attempt::NotFound => {
                warn!(target_url = label, attempt, "404 Not Found, not retrying");
                return Err(RequestFailure::NotFound {
                    url: label.to_string(),
                });
            }
            Attempt::Invalid(reason) => {
                return Err(RequestFailure::InvalidRequest(reason));
            }
            ref failed => failed
                .kind()
                .filter(|kind| kind.is_retryable())
                .unwrap_or(FailureKind::TransientNetwork),
        };
        last = Some(kind);

        let remaining = max_retries - attempt - 1;
        if remaining == 0 {
            warn!(
                target_url = label,
                attempt,
                kind = %kind,
                detail = %attempt_detail(&outcome),
                "Request failed on final attempt"
            );
            break;
        }

        let wait = policy.wait(kind, attempt);
        warn!(
            target_url = label,
            attempt,
            kind = %kind,
            detail = %attempt_detail(&outcome),
            wait_secs = wait.as_secs_f64(),
            remaining,
            "Request failed, backing off"
        );
        tokio::time::sleep(wait).await;
    }

    Err(RequestFailure::RetriesExhausted {
        attempts: max_retries,
        last,
    })
}

fn attempt_detail<T>(outcome: &Attempt<T>) -> Cow<'_, str> {
    match outcome {
        Attempt::Transient(reason) | Attempt::Invalid(reason) => Cow::Borrowed(reason),
        Attempt::ServerError(status) => Cow::Owned(format!("HTTP {}", status)),
        Attempt::RateLimited => Cow::Borrowed("HTTP 429"),
        Attempt::EmptyResponse => Cow::Borrowed("empty body"),
        Attempt::NotFound => Cow::Borrowed("HTTP 404"),
        Attempt::Success(_) => Cow::Borrowed("ok"),
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Per-call timeout and attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for CallBudget {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// One logical GET
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>, budget: CallBudget) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            headers: HeaderMap::new(),
            timeout: budget.timeout,
            max_retries: budget.max_retries,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }
}

/// Successful response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// HTTP client shared by all adapters of one source
#[derive(Debug, Clone)]
pub struct RequestClient {
    http: Client,
    policy: BackoffPolicy,
    pacer: Option<Arc<RequestPacer>>,
}

impl RequestClient {
    pub fn new(user_agent: &str) -> Result<Self, AcquireError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AcquireError::Client(e.to_string()))?;

        Ok(Self {
            http,
            policy: BackoffPolicy::default(),
            pacer: None,
        })
    }

    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<RequestPacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Perform one logical GET with retry/backoff
    pub async fn request(&self, spec: &RequestSpec) -> Result<Payload, RequestFailure> {
        run_with_backoff(&spec.url, spec.max_retries, &self.policy, |_| {
            self.attempt_once(spec)
        })
        .await
    }

    async fn attempt_once(&self, spec: &RequestSpec) -> Attempt<Payload> {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        let response = match self
            .http
            .get(&spec.url)
            .query(&spec.params)
            .headers(spec.headers.clone())
            .timeout(spec.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Attempt::Invalid(e.to_string()),
            Err(e) => return Attempt::Transient(e.to_string()),
        };

        let status = response.status();
        if let Some(failed) = classify_status(status) {
            return failed;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match response.bytes().await {
            Ok(body) if body.iter().all(u8::is_ascii_whitespace) => Attempt::EmptyResponse,
            Ok(body) => Attempt::Success(Payload {
                body: body.to_vec(),
                content_type,
            }),
            Err(e) => Attempt::Transient(format!("body read failed: {}", e)),
        }
    }
}

/// Classify a non-2xx status; `None` means the body should be read
pub fn classify_status<T>(status: StatusCode) -> Option<Attempt<T>> {
    if status == StatusCode::NOT_FOUND {
        Some(Attempt::NotFound)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Some(Attempt::RateLimited)
    } else if !status.is_success() {
        Some(Attempt::ServerError(status.as_u16()))
    } else {
        None
    }
}
