//! Shared fixtures for the wiremock-backed integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use skg_crawl::services::{BackoffPolicy, CallBudget, OrchestratorSettings, RequestClient};
use std::time::Duration;

/// Client with a 10 ms backoff unit and no pacing clock
pub fn test_client() -> RequestClient {
    RequestClient::new("skg-crawl-tests")
        .expect("client builds")
        .with_backoff(BackoffPolicy::with_unit(Duration::from_millis(10)))
}

pub fn budget(max_retries: u32) -> CallBudget {
    CallBudget {
        timeout: Duration::from_secs(5),
        max_retries,
    }
}

pub fn no_pacing(workers: usize) -> OrchestratorSettings {
    OrchestratorSettings {
        workers,
        pacing: Duration::ZERO,
    }
}

/// One full-studies entry
pub fn study(nct_id: &str, title: &str) -> Value {
    json!({
        "Study": {
            "ProtocolSection": {
                "IdentificationModule": { "NCTId": nct_id, "OfficialTitle": title },
                "StatusModule": { "OverallStatus": "Completed" },
                "ConditionsModule": { "ConditionList": { "Condition": ["Zinc Deficiency"] } },
                "ArmsInterventionsModule": {
                    "InterventionList": {
                        "Intervention": [
                            { "InterventionName": "Zinc sulfate", "InterventionType": "Dietary Supplement" }
                        ]
                    }
                },
                "OutcomesModule": {
                    "PrimaryOutcomeList": { "PrimaryOutcome": [ { "PrimaryOutcomeMeasure": "Serum zinc" } ] }
                }
            }
        }
    })
}

pub fn studies_response(studies: Vec<Value>) -> Value {
    json!({
        "FullStudiesResponse": {
            "APIVrs": "1.01.05",
            "NStudiesFound": studies.len(),
            "MinRank": 1,
            "MaxRank": 100,
            "FullStudies": studies
        }
    })
}

pub fn empty_studies_response() -> Value {
    json!({ "FullStudiesResponse": { "NStudiesFound": 0 } })
}

pub fn esearch_response(ids: &[&str]) -> Value {
    json!({
        "header": { "type": "esearch", "version": "0.3" },
        "esearchresult": {
            "count": ids.len().to_string(),
            "retmax": ids.len().to_string(),
            "retstart": "0",
            "idlist": ids
        }
    })
}

pub const EFETCH_BODY: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">31111111</PMID>
      <Article>
        <Journal>
          <JournalIssue><PubDate><Year>2021</Year><Month>Mar</Month><Day>4</Day></PubDate></JournalIssue>
          <Title>Journal of Trace Elements</Title>
        </Journal>
        <ArticleTitle>Zinc status in athletes.</ArticleTitle>
        <Abstract><AbstractText>Short abstract.</AbstractText></Abstract>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">32222222</PMID>
      <Article>
        <ArticleTitle>Zinc and sleep.</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

pub const DSLD_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<results>
  <product>
    <name>Zinc Picolinate</name>
    <manufacturer>Thorne</manufacturer>
    <ingredients>
      <ingredient><name>Zinc</name><amount>30 mg</amount></ingredient>
    </ingredients>
    <health_claims><health_claim>Supports immune health</health_claim></health_claims>
  </product>
</results>"#;
