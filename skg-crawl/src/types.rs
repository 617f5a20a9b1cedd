//! Core types and the source adapter capability
//!
//! - `CanonicalTerm`: entity identifier plus the term sent upstream
//! - `NormalizedRecord`: one flat row, field order fixed by the source schema
//! - `EntityResultSet`: every record one source produced for one entity
//! - `SourceAdapter`: `acquire(term) -> records`, implemented once per source

use crate::error::AcquireError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Sources
// ============================================================================

/// External data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Clinical-trial registry (ClinicalTrials.gov)
    ClinicalTrials,
    /// Product-label database (NIH DSLD)
    ProductLabels,
    /// Biomedical-literature index (PubMed E-utilities)
    Literature,
}

impl Source {
    pub const ALL: [Source; 3] = [
        Source::ClinicalTrials,
        Source::ProductLabels,
        Source::Literature,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Source::ClinicalTrials => "clinical_trials",
            Source::ProductLabels => "product_labels",
            Source::Literature => "literature",
        }
    }

    /// Output directory name under `data/raw`
    pub fn dir_name(self) -> &'static str {
        match self {
            Source::ClinicalTrials => "clinical_trials",
            Source::ProductLabels => "nih_dsld",
            Source::Literature => "pubmed",
        }
    }

    /// Column set every record of this source carries, in header order
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Source::ClinicalTrials => crate::adapters::clinical_trials::FIELDS,
            Source::ProductLabels => crate::adapters::product_labels::FIELDS,
            Source::Literature => crate::adapters::literature::FIELDS,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Data model
// ============================================================================

/// Entity identifier and the external-vocabulary term it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTerm {
    entity: String,
    term: String,
}

impl CanonicalTerm {
    pub fn new(entity: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            term: term.into(),
        }
    }

    /// Localized identifier as listed in the entity list
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Term sent to the external API
    pub fn term(&self) -> &str {
        &self.term
    }

    /// False when the resolver fell back to the identifier itself
    pub fn is_mapped(&self) -> bool {
        self.entity != self.term
    }
}

/// Flat field-name → value row
///
/// Only built through the per-source record structs, so every record of a
/// source has exactly that source's field list in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    fields: Vec<(&'static str, String)>,
}

impl NormalizedRecord {
    pub(crate) fn from_pairs(fields: Vec<(&'static str, String)>) -> Self {
        Self { fields }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Records one source produced for one entity; empty is a valid end state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityResultSet {
    pub entity: String,
    pub source: Source,
    pub records: Vec<NormalizedRecord>,
}

impl EntityResultSet {
    pub fn new(entity: impl Into<String>, source: Source, records: Vec<NormalizedRecord>) -> Self {
        Self {
            entity: entity.into(),
            source,
            records,
        }
    }

    pub fn empty(entity: impl Into<String>, source: Source) -> Self {
        Self::new(entity, source, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Result of parsing one whole payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub records: Vec<NormalizedRecord>,
    /// Items discarded for lacking their primary identifier
    pub dropped: usize,
}

// ============================================================================
// Source adapter trait
// ============================================================================

/// One external source
///
/// Zero results, 404 and exhausted retries are all reported as an empty
/// `EntityResultSet`. `Err` is reserved for failures nobody planned for;
/// the orchestrator logs those and continues with an empty set.
///
/// # Example
/// ```rust,ignore
/// let adapter = ClinicalTrialsAdapter::new(client, budget);
/// let set = adapter.acquire(&CanonicalTerm::new("锌", "Zinc")).await?;
/// println!("{} records for {}", set.len(), set.entity);
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    async fn acquire(&self, term: &CanonicalTerm) -> Result<EntityResultSet, AcquireError>;
}
