//! # skg-crawl
//!
//! Resilient multi-source acquisition for the supplement knowledge graph.
//!
//! For each entity in the supplement list, every source adapter resolves the
//! entity to its canonical term, queries the upstream API through the
//! retrying request client, parses the payload into flat records, and writes
//! one CSV file per entity with data.
//!
//! **Sources:**
//! - Clinical-trial registry → `data/raw/clinical_trials/`
//! - Product-label database → `data/raw/nih_dsld/`
//! - Biomedical-literature index → `data/raw/pubmed/`

pub mod adapters;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use error::{AcquireError, FailureKind, ParseError, RequestFailure, SinkError};
pub use types::{CanonicalTerm, EntityResultSet, NormalizedRecord, Source, SourceAdapter};
