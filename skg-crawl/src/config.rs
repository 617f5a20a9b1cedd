//! Runtime settings per source
//!
//! Resolution order for every tunable:
//! 1. Command line (clap also reads the matching `SKG_*` environment variable)
//! 2. TOML `[crawler]` table
//! 3. Built-in per-source default
//!
//! Out-of-range values are clamped with a warning, never rejected.

use crate::services::request_client::CallBudget;
use crate::types::Source;
use skg_common::config::{get_user_agent, CrawlerSection};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::warn;

/// Upper bound for concurrent workers per source
pub const MAX_WORKERS: usize = 5;

/// Upper bound for the post-completion pacing delay
pub const MAX_PACING_SECS: u64 = 60;

/// Default attempt budget for every source
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fully resolved settings for one source run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub source: Source,
    pub workers: usize,
    pub pacing: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Pacing clock shared by every request to this source
    pub requests_per_second: NonZeroU32,
    pub user_agent: String,
}

impl SourceSettings {
    /// Built-in defaults
    ///
    /// | source     | workers | pacing | timeout | rps |
    /// |------------|---------|--------|---------|-----|
    /// | trials     | 2       | 5 s    | 45 s    | 1   |
    /// | labels     | 5       | 3 s    | 30 s    | 2   |
    /// | literature | 3       | 3 s    | 30 s    | 3   |
    pub fn defaults(source: Source) -> Self {
        let (workers, pacing_secs, timeout_secs, rps) = match source {
            Source::ClinicalTrials => (2, 5, 45, 1),
            Source::ProductLabels => (5, 3, 30, 2),
            Source::Literature => (3, 3, 30, 3),
        };

        Self {
            source,
            workers,
            pacing: Duration::from_secs(pacing_secs),
            timeout: Duration::from_secs(timeout_secs),
            max_retries: DEFAULT_MAX_RETRIES,
            requests_per_second: NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
            user_agent: get_user_agent(),
        }
    }

    /// Apply overrides on top of the defaults, clamping to the allowed ranges
    pub fn with_overrides(mut self, overrides: &CrawlOverrides) -> Self {
        if let Some(workers) = overrides.workers {
            let clamped = workers.clamp(1, MAX_WORKERS);
            if clamped != workers {
                warn!(
                    source = %self.source,
                    requested = workers,
                    using = clamped,
                    "Worker count out of range, clamped"
                );
            }
            self.workers = clamped;
        }

        if let Some(pacing_secs) = overrides.pacing_secs {
            let clamped = pacing_secs.min(MAX_PACING_SECS);
            if clamped != pacing_secs {
                warn!(
                    source = %self.source,
                    requested = pacing_secs,
                    using = clamped,
                    "Pacing delay out of range, clamped"
                );
            }
            self.pacing = Duration::from_secs(clamped);
        }

        if let Some(max_retries) = overrides.max_retries {
            if max_retries == 0 {
                warn!(source = %self.source, "max_retries = 0: no request will be sent");
            }
            self.max_retries = max_retries;
        }

        if let Some(user_agent) = overrides.user_agent.as_deref() {
            if !user_agent.trim().is_empty() {
                self.user_agent = user_agent.to_string();
            }
        }

        self
    }

    pub fn budget(&self) -> CallBudget {
        CallBudget {
            timeout: self.timeout,
            max_retries: self.max_retries,
        }
    }
}

/// User-supplied overrides shared by every source in one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOverrides {
    pub workers: Option<usize>,
    pub pacing_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub user_agent: Option<String>,
}

impl CrawlOverrides {
    /// Merge command-line values (winning) with the TOML `[crawler]` table
    pub fn merge(cli: CrawlOverrides, toml: &CrawlerSection) -> Self {
        Self {
            workers: cli.workers.or(toml.workers),
            pacing_secs: cli.pacing_secs.or(toml.pacing_secs),
            max_retries: cli.max_retries.or(toml.max_retries),
            user_agent: cli.user_agent.or_else(|| toml.user_agent.clone()),
        }
    }
}
