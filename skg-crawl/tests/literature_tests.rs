//! Literature-index acquisition: search-then-fetch against a mock upstream

mod helpers;

use helpers::*;
use skg_crawl::adapters::LiteratureAdapter;
use skg_crawl::{CanonicalTerm, SourceAdapter};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> LiteratureAdapter {
    LiteratureAdapter::new(test_client(), budget(3)).with_endpoints(
        format!("{}/esearch.fcgi", server.uri()),
        format!("{}/efetch.fcgi", server.uri()),
    )
}

#[tokio::test]
async fn test_zero_ids_skips_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_response(&[])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EFETCH_BODY))
        .expect(0)
        .mount(&server)
        .await;

    let set = adapter(&server)
        .acquire(&CanonicalTerm::new("UnknownHerb", "UnknownHerb"))
        .await
        .unwrap();

    assert!(set.is_empty());
}

#[tokio::test]
async fn test_failed_search_skips_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EFETCH_BODY))
        .expect(0)
        .mount(&server)
        .await;

    let set = adapter(&server)
        .acquire(&CanonicalTerm::new("Zinc", "Zinc"))
        .await
        .unwrap();

    assert!(set.is_empty());
}

#[tokio::test]
async fn test_search_then_single_batched_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "pubmed"))
        .and(query_param("retmax", "50"))
        .and(query_param("retmode", "json"))
        .and(query_param(
            "term",
            r#"Zinc[Title/Abstract] AND ("dietary supplement"[MeSH] OR "dietary supplements"[MeSH])"#,
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(esearch_response(&["31111111", "32222222"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "31111111,32222222"))
        .and(query_param("retmode", "xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(EFETCH_BODY.as_bytes(), "application/xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let set = adapter(&server)
        .acquire(&CanonicalTerm::new("锌", "Zinc"))
        .await
        .unwrap();

    assert_eq!(set.entity, "锌");
    assert_eq!(set.len(), 2);

    let first = &set.records[0];
    assert_eq!(first.get("pmid"), Some("31111111"));
    assert_eq!(first.get("title"), Some("Zinc status in athletes."));
    assert_eq!(first.get("abstract"), Some("Short abstract."));
    assert_eq!(first.get("journal"), Some("Journal of Trace Elements"));
    assert_eq!(first.get("pub_date"), Some("2021 Mar 4"));

    let second = &set.records[1];
    assert_eq!(second.get("abstract"), Some("No Abstract"));
    assert_eq!(second.get("journal"), Some("Unknown Journal"));
    assert_eq!(second.get("pub_date"), Some("Unknown Date"));
}

#[tokio::test]
async fn test_long_abstract_truncated() {
    let long = "x".repeat(800);
    let body = format!(
        "<PubmedArticleSet><PubmedArticle><PMID>1</PMID><AbstractText>{}</AbstractText></PubmedArticle></PubmedArticleSet>",
        long
    );

    let server = MockServer::start().await;
    Mock::given(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_response(&["1"])))
        .mount(&server)
        .await;
    Mock::given(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let set = adapter(&server)
        .acquire(&CanonicalTerm::new("Zinc", "Zinc"))
        .await
        .unwrap();

    let text = set.records[0].get("abstract").unwrap();
    assert_eq!(text.len(), 503);
    assert!(text.ends_with("..."));
}

#[tokio::test]
async fn test_html_error_page_from_fetch_is_empty_set() {
    let server = MockServer::start().await;
    Mock::given(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(esearch_response(&["1"])))
        .mount(&server)
        .await;
    Mock::given(path("/efetch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>Busy<br></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let set = adapter(&server)
        .acquire(&CanonicalTerm::new("Zinc", "Zinc"))
        .await
        .unwrap();

    assert!(set.is_empty());
}
