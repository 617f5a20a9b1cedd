//! Source adapters
//!
//! Each adapter = shared `RequestClient` + pure parse functions over raw
//! bytes. Parse functions default missing optional fields and drop only the
//! records that lack their primary identifier.
//!
//! # Adapters
//! 1. **clinical_trials** - one JSON request, study objects → rows
//! 2. **product_labels** - one XML request, product nodes → rows
//! 3. **literature** - JSON search for ids, then one batched XML fetch

pub mod clinical_trials;
pub mod literature;
pub mod product_labels;

pub use clinical_trials::ClinicalTrialsAdapter;
pub use literature::LiteratureAdapter;
pub use product_labels::ProductLabelsAdapter;

use crate::config::SourceSettings;
use crate::error::{AcquireError, FailureKind, ParseError, RequestFailure};
use crate::services::rate_limiter::RequestPacer;
use crate::services::request_client::{Payload, RequestClient};
use crate::types::{CanonicalTerm, EntityResultSet, ParseOutcome, Source, SourceAdapter};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the adapter for `settings.source` with its own pacing clock
pub fn build_adapter(settings: &SourceSettings) -> Result<Arc<dyn SourceAdapter>, AcquireError> {
    let pacer = Arc::new(RequestPacer::per_second(settings.requests_per_second));
    let client = RequestClient::new(&settings.user_agent)?.with_pacer(pacer);
    let budget = settings.budget();

    let adapter: Arc<dyn SourceAdapter> = match settings.source {
        Source::ClinicalTrials => Arc::new(ClinicalTrialsAdapter::new(client, budget)),
        Source::ProductLabels => Arc::new(ProductLabelsAdapter::new(client, budget)),
        Source::Literature => Arc::new(LiteratureAdapter::new(client, budget)),
    };
    Ok(adapter)
}

/// Turn a terminal request failure into the adapter's result
///
/// 404 and exhausted retries are expected outcomes and become an empty set;
/// an unbuildable request is a bug and propagates.
pub(crate) fn absorb_request_failure(
    term: &CanonicalTerm,
    source: Source,
    failure: RequestFailure,
) -> Result<EntityResultSet, AcquireError> {
    match failure {
        RequestFailure::InvalidRequest(_) => Err(AcquireError::Request(failure)),
        other => {
            warn!(
                entity = %term.entity(),
                term = %term.term(),
                source = %source,
                kind = %other.kind().map_or("unclassified", FailureKind::as_str),
                error = %other,
                "No data retrieved"
            );
            Ok(EntityResultSet::empty(term.entity(), source))
        }
    }
}

/// Whole-payload parse failure degrades the entity to an empty set
///
/// The declared content type is logged: an HTML error page served with 200
/// is the usual culprit.
pub(crate) fn absorb_parse_failure(
    term: &CanonicalTerm,
    source: Source,
    payload: &Payload,
    error: ParseError,
) -> EntityResultSet {
    warn!(
        entity = %term.entity(),
        source = %source,
        kind = %FailureKind::ParseFailure,
        content_type = payload.content_type.as_deref().unwrap_or("unknown"),
        bytes = payload.body.len(),
        error = %error,
        "Payload could not be parsed"
    );
    EntityResultSet::empty(term.entity(), source)
}

/// Log the parse result and wrap it as the entity's result set
pub(crate) fn finish(term: &CanonicalTerm, source: Source, outcome: ParseOutcome) -> EntityResultSet {
    if outcome.dropped > 0 {
        warn!(
            entity = %term.entity(),
            source = %source,
            dropped = outcome.dropped,
            "Dropped records without primary identifier"
        );
    }

    if outcome.records.is_empty() {
        info!(entity = %term.entity(), source = %source, "No results found");
    } else {
        info!(
            entity = %term.entity(),
            source = %source,
            records = outcome.records.len(),
            "Parsed records"
        );
    }

    EntityResultSet::new(term.entity(), source, outcome.records)
}

/// Join non-empty values with the list separator used in every output column
pub(crate) fn join_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .filter(|s| !s.as_ref().trim().is_empty())
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
