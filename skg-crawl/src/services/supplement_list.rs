//! Entity list loading
//!
//! One identifier per line. Blank lines and repeats are ignored; first
//! occurrence wins so the submission order is stable.

use skg_common::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Parse list content into ordered, de-duplicated identifiers
pub fn parse_supplement_list(content: &str) -> Vec<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut seen = HashSet::new();

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Load the entity list
///
/// A missing or empty list is fatal: there is nothing to run.
pub fn load_supplement_list(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "Supplement list not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let entities = parse_supplement_list(&content);

    if entities.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Supplement list is empty: {}",
            path.display()
        )));
    }

    info!(
        path = %path.display(),
        count = entities.len(),
        "Loaded supplement list"
    );
    Ok(entities)
}
