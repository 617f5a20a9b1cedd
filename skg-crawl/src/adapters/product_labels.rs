//! Product-label adapter (NIH Dietary Supplement Label Database)
//!
//! One XML request per entity, one row per `<product>` node anywhere in the
//! document. A body that is not well-formed XML yields an empty set; the
//! parse is never retried.

use super::{absorb_parse_failure, absorb_request_failure, finish, join_list};
use crate::error::{AcquireError, ParseError};
use crate::services::request_client::{CallBudget, RequestClient, RequestSpec};
use crate::services::xml_tree::{parse_document, XmlElement};
use crate::types::{
    CanonicalTerm, EntityResultSet, NormalizedRecord, ParseOutcome, Source, SourceAdapter,
};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::debug;

pub const DSLD_API_URL: &str = "https://dsld.nlm.nih.gov/dsld/api";

pub const FIELDS: &[&str] = &[
    "supplement",
    "product_name",
    "manufacturer",
    "ingredients",
    "health_claims",
];

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub supplement: String,
    pub product_name: String,
    pub manufacturer: String,
    pub ingredients: String,
    pub health_claims: String,
}

impl From<ProductRecord> for NormalizedRecord {
    fn from(r: ProductRecord) -> Self {
        NormalizedRecord::from_pairs(vec![
            (FIELDS[0], r.supplement),
            (FIELDS[1], r.product_name),
            (FIELDS[2], r.manufacturer),
            (FIELDS[3], r.ingredients),
            (FIELDS[4], r.health_claims),
        ])
    }
}

/// Parse a label-database response; `supplement` fills the first column
pub fn parse_products(supplement: &str, body: &[u8]) -> Result<ParseOutcome, ParseError> {
    let root = parse_document(body)?;

    let records: Vec<NormalizedRecord> = root
        .find_all("product")
        .into_iter()
        .map(|product| NormalizedRecord::from(parse_product(supplement, product)))
        .collect();

    Ok(ParseOutcome {
        records,
        dropped: 0,
    })
}

/// Parse one `<product>` element, defaulting every missing field
pub fn parse_product(supplement: &str, product: &XmlElement) -> ProductRecord {
    let ingredients = product
        .find_all("ingredient")
        .into_iter()
        .map(|ingredient| {
            format!(
                "{} ({})",
                child_text(ingredient, "name"),
                child_text(ingredient, "amount")
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    let health_claims = join_list(
        product
            .find_all("health_claim")
            .into_iter()
            .map(XmlElement::text),
    );

    ProductRecord {
        supplement: supplement.to_string(),
        product_name: child_text(product, "name"),
        manufacturer: child_text(product, "manufacturer"),
        ingredients,
        health_claims,
    }
}

fn child_text(el: &XmlElement, name: &str) -> String {
    el.child(name)
        .and_then(XmlElement::non_empty_text)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Product-label adapter
pub struct ProductLabelsAdapter {
    client: RequestClient,
    budget: CallBudget,
    endpoint: String,
}

impl ProductLabelsAdapter {
    pub fn new(client: RequestClient, budget: CallBudget) -> Self {
        Self {
            client,
            budget,
            endpoint: DSLD_API_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SourceAdapter for ProductLabelsAdapter {
    fn source(&self) -> Source {
        Source::ProductLabels
    }

    async fn acquire(&self, term: &CanonicalTerm) -> Result<EntityResultSet, AcquireError> {
        let source = self.source();
        debug!(entity = %term.entity(), term = %term.term(), "Querying label database");

        let spec = RequestSpec::get(&self.endpoint, self.budget)
            .param("name", term.term())
            .param("format", "xml")
            .header(ACCEPT, "application/xml");

        let payload = match self.client.request(&spec).await {
            Ok(payload) => payload,
            Err(failure) => return absorb_request_failure(term, source, failure),
        };

        match parse_products(term.entity(), &payload.body) {
            Ok(outcome) => Ok(finish(term, source, outcome)),
            Err(e) => Ok(absorb_parse_failure(term, source, &payload, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PRODUCTS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<products>
  <product>
    <name>Zinc 50 mg</name>
    <manufacturer>Acme Nutrition</manufacturer>
    <ingredients>
      <ingredient><name>Zinc</name><amount>50 mg</amount></ingredient>
      <ingredient><name>Copper</name></ingredient>
    </ingredients>
    <health_claims>
      <health_claim>Supports immune function</health_claim>
      <health_claim></health_claim>
      <health_claim>Antioxidant</health_claim>
    </health_claims>
  </product>
  <product>
    <ingredients/>
  </product>
</products>"#;

    #[test]
    fn test_products_parsed_with_defaults() {
        let outcome = parse_products("锌", TWO_PRODUCTS).unwrap();
        assert_eq!(outcome.records.len(), 2);

        let first = &outcome.records[0];
        assert_eq!(first.get("supplement"), Some("锌"));
        assert_eq!(first.get("product_name"), Some("Zinc 50 mg"));
        assert_eq!(first.get("manufacturer"), Some("Acme Nutrition"));
        assert_eq!(
            first.get("ingredients"),
            Some("Zinc (50 mg); Copper (Unknown)")
        );
        assert_eq!(
            first.get("health_claims"),
            Some("Supports immune function; Antioxidant")
        );

        let second = &outcome.records[1];
        assert_eq!(second.get("product_name"), Some("Unknown"));
        assert_eq!(second.get("manufacturer"), Some("Unknown"));
        assert_eq!(second.get("ingredients"), Some(""));
        assert_eq!(second.get("health_claims"), Some(""));
    }

    #[test]
    fn test_ingredient_name_not_taken_as_product_name() {
        let body = br#"<products><product><ingredient><name>Zinc</name></ingredient></product></products>"#;
        let outcome = parse_products("Zinc", body).unwrap();
        assert_eq!(outcome.records[0].get("product_name"), Some("Unknown"));
    }

    #[test]
    fn test_no_products_is_empty() {
        let outcome = parse_products("Zinc", b"<products/>").unwrap();
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        assert!(matches!(
            parse_products("Zinc", b"<products><product><name>Zinc</product>"),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn test_field_order_matches_schema() {
        let outcome = parse_products("Zinc", TWO_PRODUCTS).unwrap();
        for record in &outcome.records {
            assert_eq!(record.field_names().collect::<Vec<_>>(), FIELDS.to_vec());
        }
    }
}
