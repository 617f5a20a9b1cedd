//! Clinical-trial registry adapter (ClinicalTrials.gov full-studies query)
//!
//! One request per entity. The response nests everything several modules
//! deep and any of them may be absent, so each output field is read on its
//! own path with its own default. A study without an NCT id is dropped.
//!
//! # API Reference
//! - Endpoint: https://clinicaltrials.gov/api/query/full_studies
//! - Query: `"<term>"[Supplement] AND "dietary supplement"[Intervention]`
//! - Ranks 1..=100, `fmt=json`

use super::{absorb_parse_failure, absorb_request_failure, finish, join_list};
use crate::error::{AcquireError, ParseError};
use crate::services::request_client::{CallBudget, RequestClient, RequestSpec};
use crate::types::{
    CanonicalTerm, EntityResultSet, NormalizedRecord, ParseOutcome, Source, SourceAdapter,
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

pub const TRIALS_API_URL: &str = "https://clinicaltrials.gov/api/query/full_studies";

/// Studies requested per entity
pub const MAX_RANK: u32 = 100;

pub const FIELDS: &[&str] = &[
    "nct_id",
    "title",
    "status",
    "conditions",
    "interventions",
    "primary_outcomes",
];

const NO_TITLE: &str = "No title";
const UNKNOWN_STATUS: &str = "Unknown status";
const UNNAMED_INTERVENTION: &str = "Unnamed intervention";
const UNKNOWN_TYPE: &str = "Unknown type";
const UNSPECIFIED: &str = "Unspecified";

/// One parsed study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialRecord {
    pub nct_id: String,
    pub title: String,
    pub status: String,
    pub conditions: String,
    pub interventions: String,
    pub primary_outcomes: String,
}

impl From<TrialRecord> for NormalizedRecord {
    fn from(r: TrialRecord) -> Self {
        NormalizedRecord::from_pairs(vec![
            (FIELDS[0], r.nct_id),
            (FIELDS[1], r.title),
            (FIELDS[2], r.status),
            (FIELDS[3], r.conditions),
            (FIELDS[4], r.interventions),
            (FIELDS[5], r.primary_outcomes),
        ])
    }
}

/// Boolean query expression sent as `expr`
pub fn build_query_expr(term: &str) -> String {
    format!(
        "\"{}\"[Supplement] AND \"dietary supplement\"[Intervention]",
        term
    )
}

/// Parse a full-studies response body
pub fn parse_studies(body: &[u8]) -> Result<ParseOutcome, ParseError> {
    let root: Value = serde_json::from_slice(body)?;
    let response = &root["FullStudiesResponse"];

    let found = response["NStudiesFound"].as_u64().unwrap_or(0);
    if found == 0 {
        return Ok(ParseOutcome::default());
    }

    let mut outcome = ParseOutcome::default();
    for entry in response["FullStudies"].as_array().into_iter().flatten() {
        match parse_study(&entry["Study"]) {
            Some(record) => outcome.records.push(record.into()),
            None => outcome.dropped += 1,
        }
    }

    debug!(
        found,
        parsed = outcome.records.len(),
        dropped = outcome.dropped,
        "Parsed full-studies response"
    );
    Ok(outcome)
}

/// Parse one `Study` object; `None` when the NCT id is missing
pub fn parse_study(study: &Value) -> Option<TrialRecord> {
    let protocol = &study["ProtocolSection"];
    let identification = &protocol["IdentificationModule"];

    let nct_id = non_empty_str(&identification["NCTId"])?;

    let title = non_empty_str(&identification["OfficialTitle"]).unwrap_or(NO_TITLE);
    let status =
        non_empty_str(&protocol["StatusModule"]["OverallStatus"]).unwrap_or(UNKNOWN_STATUS);

    let conditions = join_list(
        protocol["ConditionsModule"]["ConditionList"]["Condition"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(Value::as_str),
    );

    let interventions = join_list(
        protocol["ArmsInterventionsModule"]["InterventionList"]["Intervention"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|intervention| {
                let name = non_empty_str(&intervention["InterventionName"])
                    .unwrap_or(UNNAMED_INTERVENTION);
                let kind =
                    non_empty_str(&intervention["InterventionType"]).unwrap_or(UNKNOWN_TYPE);
                format!("{} ({})", name, kind)
            }),
    );

    let primary_outcomes = protocol["OutcomesModule"]["PrimaryOutcomeList"]["PrimaryOutcome"]
        .as_array()
        .and_then(|outcomes| outcomes.first())
        .and_then(|first| non_empty_str(&first["PrimaryOutcomeMeasure"]))
        .unwrap_or(UNSPECIFIED);

    Some(TrialRecord {
        nct_id: nct_id.to_string(),
        title: title.to_string(),
        status: status.to_string(),
        conditions,
        interventions,
        primary_outcomes: primary_outcomes.to_string(),
    })
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Trial-registry adapter
pub struct ClinicalTrialsAdapter {
    client: RequestClient,
    budget: CallBudget,
    endpoint: String,
}

impl ClinicalTrialsAdapter {
    pub fn new(client: RequestClient, budget: CallBudget) -> Self {
        Self {
            client,
            budget,
            endpoint: TRIALS_API_URL.to_string(),
        }
    }

    /// Point at a different endpoint (mirrors, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_spec(&self, term: &CanonicalTerm) -> RequestSpec {
        RequestSpec::get(&self.endpoint, self.budget)
            .param("expr", build_query_expr(term.term()))
            .param("min_rnk", "1")
            .param("max_rnk", MAX_RANK.to_string())
            .param("fmt", "json")
            .header(ACCEPT, "application/json")
    }
}

#[async_trait]
impl SourceAdapter for ClinicalTrialsAdapter {
    fn source(&self) -> Source {
        Source::ClinicalTrials
    }

    async fn acquire(&self, term: &CanonicalTerm) -> Result<EntityResultSet, AcquireError> {
        let source = self.source();
        debug!(entity = %term.entity(), term = %term.term(), "Querying trial registry");

        let payload = match self.client.request(&self.request_spec(term)).await {
            Ok(payload) => payload,
            Err(failure) => return absorb_request_failure(term, source, failure),
        };

        match parse_studies(&payload.body) {
            Ok(outcome) => Ok(finish(term, source, outcome)),
            Err(e) => Ok(absorb_parse_failure(term, source, &payload, e)),
        }
    }
}
