//! Localized identifier → canonical term lookup
//!
//! Unmapped identifiers pass through unchanged so they are still queried.

use crate::types::CanonicalTerm;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Names the downstream graph stage already uses for its supplement nodes
pub const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("复合B族", "Vitamin B Complex"),
    ("锌", "Zinc"),
    ("镁（甘氨酸镁）", "Magnesium Glycinate"),
    ("维生素C", "Vitamin C"),
    ("铁", "Iron"),
    ("钙", "Calcium"),
    ("维生素D", "Vitamin D"),
];

/// Read-only mapping table, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    table: BTreeMap<String, String>,
}

impl NameResolver {
    pub fn new(table: BTreeMap<String, String>) -> Self {
        Self { table }
    }

    /// Built-in table only
    pub fn with_defaults() -> Self {
        Self::new(
            BUILTIN_NAMES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Built-in table extended (and overridden) by configured entries
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut resolver = Self::with_defaults();
        for (localized, canonical) in overrides {
            let canonical = canonical.trim();
            if canonical.is_empty() {
                continue;
            }
            resolver
                .table
                .insert(localized.trim().to_string(), canonical.to_string());
        }
        resolver
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Resolve one identifier; never fails
    pub fn resolve(&self, entity: &str) -> CanonicalTerm {
        match self.table.get(entity) {
            Some(canonical) => {
                info!(entity = %entity, term = %canonical, "Resolved entity name");
                CanonicalTerm::new(entity, canonical.clone())
            }
            None => {
                debug!(entity = %entity, "No mapping entry, querying identifier as-is");
                CanonicalTerm::new(entity, entity)
            }
        }
    }

    pub fn resolve_all(&self, entities: &[String]) -> Vec<CanonicalTerm> {
        entities.iter().map(|e| self.resolve(e)).collect()
    }
}
