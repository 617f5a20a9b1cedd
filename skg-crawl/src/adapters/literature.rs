//! Literature-index adapter (PubMed E-utilities)
//!
//! Two sequential round trips:
//! 1. `esearch` (JSON) → list of PMIDs
//! 2. `efetch` (XML) → all articles in one batched request
//!
//! An empty id list, or a search that fails outright, ends the entity
//! before any fetch is attempted.
//!
//! # API Reference
//! - esearch: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//! - efetch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi
//! - Rate Limit: 3 requests/second without an API key

use super::{absorb_parse_failure, absorb_request_failure, finish};
use crate::error::{AcquireError, ParseError};
use crate::services::request_client::{CallBudget, RequestClient, RequestSpec};
use crate::services::xml_tree::{parse_document, XmlElement};
use crate::types::{
    CanonicalTerm, EntityResultSet, NormalizedRecord, ParseOutcome, Source, SourceAdapter,
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{debug, info};

pub const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
pub const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

/// PMIDs requested per entity
pub const SEARCH_RETMAX: u32 = 50;

/// Abstracts longer than this many characters are cut and marked
pub const ABSTRACT_MAX_CHARS: usize = 500;
pub const ELLIPSIS: &str = "...";

pub const FIELDS: &[&str] = &["pmid", "title", "abstract", "journal", "pub_date"];

const NO_TITLE: &str = "No Title";
const NO_ABSTRACT: &str = "No Abstract";
const UNKNOWN_JOURNAL: &str = "Unknown Journal";
const UNKNOWN_DATE: &str = "Unknown Date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub pmid: String,
    pub title: String,
    pub abstract_text: String,
    pub journal: String,
    pub pub_date: String,
}

impl From<ArticleRecord> for NormalizedRecord {
    fn from(r: ArticleRecord) -> Self {
        NormalizedRecord::from_pairs(vec![
            (FIELDS[0], r.pmid),
            (FIELDS[1], r.title),
            (FIELDS[2], r.abstract_text),
            (FIELDS[3], r.journal),
            (FIELDS[4], r.pub_date),
        ])
    }
}

/// esearch `term` parameter
pub fn build_search_term(term: &str) -> String {
    format!(
        "{}[Title/Abstract] AND (\"dietary supplement\"[MeSH] OR \"dietary supplements\"[MeSH])",
        term
    )
}

/// Extract PMIDs from an esearch JSON body
pub fn parse_search_ids(body: &[u8]) -> Result<Vec<String>, ParseError> {
    let root: Value = serde_json::from_slice(body)?;
    Ok(root["esearchresult"]["idlist"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parse an efetch XML body
pub fn parse_articles(body: &[u8]) -> Result<ParseOutcome, ParseError> {
    let root = parse_document(body)?;
    let mut outcome = ParseOutcome::default();

    for article in root.find_all("PubmedArticle") {
        match parse_article(article) {
            Some(record) => outcome.records.push(record.into()),
            None => outcome.dropped += 1,
        }
    }
    Ok(outcome)
}

/// Parse one `<PubmedArticle>`; `None` when it has no PMID
pub fn parse_article(article: &XmlElement) -> Option<ArticleRecord> {
    let pmid = article.find("PMID").and_then(XmlElement::non_empty_text)?;

    let title = first_text(article, "ArticleTitle").unwrap_or_else(|| NO_TITLE.to_string());
    let abstract_text = first_text(article, "AbstractText")
        .map(|text| truncate_abstract(&text))
        .unwrap_or_else(|| NO_ABSTRACT.to_string());
    // First <Title> in an article is the journal title
    let journal = first_text(article, "Title").unwrap_or_else(|| UNKNOWN_JOURNAL.to_string());
    let pub_date = article
        .find("PubDate")
        .and_then(render_pub_date)
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    Some(ArticleRecord {
        pmid,
        title,
        abstract_text,
        journal,
        pub_date,
    })
}

fn first_text(el: &XmlElement, name: &str) -> Option<String> {
    el.find(name).and_then(XmlElement::non_empty_text)
}

/// `<Year>2023</Year><Month>Jan</Month>` → `2023 Jan`; `MedlineDate` as-is
fn render_pub_date(date: &XmlElement) -> Option<String> {
    let parts: Vec<String> = date.elements().filter_map(XmlElement::non_empty_text).collect();
    if parts.is_empty() {
        date.non_empty_text()
    } else {
        Some(parts.join(" "))
    }
}

/// Cut to `ABSTRACT_MAX_CHARS` characters and append the ellipsis marker
pub fn truncate_abstract(text: &str) -> String {
    match text.char_indices().nth(ABSTRACT_MAX_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Literature-index adapter
pub struct LiteratureAdapter {
    client: RequestClient,
    budget: CallBudget,
    search_url: String,
    fetch_url: String,
}

impl LiteratureAdapter {
    pub fn new(client: RequestClient, budget: CallBudget) -> Self {
        Self {
            client,
            budget,
            search_url: ESEARCH_URL.to_string(),
            fetch_url: EFETCH_URL.to_string(),
        }
    }

    pub fn with_endpoints(
        mut self,
        search_url: impl Into<String>,
        fetch_url: impl Into<String>,
    ) -> Self {
        self.search_url = search_url.into();
        self.fetch_url = fetch_url.into();
        self
    }

    fn search_spec(&self, term: &CanonicalTerm) -> RequestSpec {
        RequestSpec::get(&self.search_url, self.budget)
            .param("db", "pubmed")
            .param("term", build_search_term(term.term()))
            .param("retmax", SEARCH_RETMAX.to_string())
            .param("retmode", "json")
            .header(ACCEPT, "application/json")
    }

    fn fetch_spec(&self, ids: &[String]) -> RequestSpec {
        RequestSpec::get(&self.fetch_url, self.budget)
            .param("db", "pubmed")
            .param("id", ids.join(","))
            .param("retmode", "xml")
            .header(ACCEPT, "application/xml")
    }
}

#[async_trait]
impl SourceAdapter for LiteratureAdapter {
    fn source(&self) -> Source {
        Source::Literature
    }

    async fn acquire(&self, term: &CanonicalTerm) -> Result<EntityResultSet, AcquireError> {
        let source = self.source();
        debug!(entity = %term.entity(), term = %term.term(), "Searching literature index");

        let search = match self.client.request(&self.search_spec(term)).await {
            Ok(payload) => payload,
            Err(failure) => return absorb_request_failure(term, source, failure),
        };

        let ids = match parse_search_ids(&search.body) {
            Ok(ids) => ids,
            Err(e) => return Ok(absorb_parse_failure(term, source, &search, e)),
        };

        if ids.is_empty() {
            info!(entity = %term.entity(), "Search returned no ids, skipping fetch");
            return Ok(EntityResultSet::empty(term.entity(), source));
        }

        debug!(entity = %term.entity(), ids = ids.len(), "Fetching articles");

        let fetched = match self.client.request(&self.fetch_spec(&ids)).await {
            Ok(payload) => payload,
            Err(failure) => return absorb_request_failure(term, source, failure),
        };

        match parse_articles(&fetched.body) {
            Ok(outcome) => Ok(finish(term, source, outcome)),
            Err(e) => Ok(absorb_parse_failure(term, source, &fetched, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_SET: &[u8] = br#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31234567</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate>
              <Year>2019</Year>
              <Month>Jul</Month>
            </PubDate>
          </JournalIssue>
          <Title>Nutrients</Title>
        </Journal>
        <ArticleTitle>Zinc and <i>immune</i> function.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Zinc matters.</AbstractText>
          <AbstractText Label="METHODS">We looked.</AbstractText>
        </Abstract>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ReferenceList><Reference><ArticleIdList><ArticleId IdType="pubmed">11111111</ArticleId></ArticleIdList></Reference></ReferenceList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>30000001</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></JournalIssue></Journal>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation><Article><ArticleTitle>No id here</ArticleTitle></Article></MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_search_term() {
        assert_eq!(
            build_search_term("Zinc"),
            r#"Zinc[Title/Abstract] AND ("dietary supplement"[MeSH] OR "dietary supplements"[MeSH])"#
        );
    }

    #[test]
    fn test_search_ids_parsed() {
        let body = br#"{"header":{},"esearchresult":{"count":"2","idlist":["31234567","30000001",""]}}"#;
        assert_eq!(
            parse_search_ids(body).unwrap(),
            vec!["31234567".to_string(), "30000001".to_string()]
        );
    }

    #[test]
    fn test_search_without_idlist_is_empty() {
        assert!(parse_search_ids(br#"{"esearchresult":{"count":"0"}}"#)
            .unwrap()
            .is_empty());
        assert!(parse_search_ids(b"not json").is_err());
    }

    #[test]
    fn test_articles_parsed_and_idless_dropped() {
        let outcome = parse_articles(ARTICLE_SET).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.dropped, 1);

        let first = &outcome.records[0];
        assert_eq!(first.get("pmid"), Some("31234567"));
        assert_eq!(first.get("title"), Some("Zinc and immune function."));
        assert_eq!(first.get("abstract"), Some("Zinc matters."));
        assert_eq!(first.get("journal"), Some("Nutrients"));
        assert_eq!(first.get("pub_date"), Some("2019 Jul"));

        let second = &outcome.records[1];
        assert_eq!(second.get("pmid"), Some("30000001"));
        assert_eq!(second.get("title"), Some(NO_TITLE));
        assert_eq!(second.get("abstract"), Some(NO_ABSTRACT));
        assert_eq!(second.get("journal"), Some(UNKNOWN_JOURNAL));
        assert_eq!(second.get("pub_date"), Some("1998 Dec-1999 Jan"));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let short = "a".repeat(ABSTRACT_MAX_CHARS);
        assert_eq!(truncate_abstract(&short), short);

        let long = "锌".repeat(ABSTRACT_MAX_CHARS + 1);
        let cut = truncate_abstract(&long);
        assert!(cut.ends_with(ELLIPSIS));
        assert_eq!(cut.chars().count(), ABSTRACT_MAX_CHARS + ELLIPSIS.len());
    }

    #[test]
    fn test_malformed_fetch_is_parse_error() {
        assert!(parse_articles(b"<PubmedArticleSet><PubmedArticle>").is_err());
    }
}
