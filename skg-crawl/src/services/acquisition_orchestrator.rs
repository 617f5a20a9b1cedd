//! Bounded-concurrency acquisition driver
//!
//! **Algorithm:**
//! 1. Each term becomes one spawned task running `adapter.acquire(term)`
//! 2. `buffer_unordered(workers)` keeps at most `workers` tasks in flight
//! 3. Results are consumed in completion order
//! 4. After each result: pacing sleep, then hand the set to the sink
//!
//! A task that returns `Err` or panics counts as failed and is written as an
//! empty set; the batch always runs to the last term. There is no
//! cancellation: once started, a term runs to its own terminal state.

use crate::services::csv_sink::{ResultSink, SinkOutcome};
use crate::types::{CanonicalTerm, EntityResultSet, Source, SourceAdapter};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Worker budget and post-completion pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub workers: usize,
    pub pacing: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            workers: 3,
            pacing: Duration::from_secs(3),
        }
    }
}

/// Per-source run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionSummary {
    pub source: Source,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Terms submitted
    pub total: usize,
    /// Entities with a file written
    pub written: usize,
    /// Entities that ended with no records (including failed ones)
    pub empty: usize,
    /// Adapter errors and panics, downgraded to empty sets
    pub failed: usize,
    /// Non-empty sets the sink could not write
    pub sink_errors: usize,
    /// Rows written across all files
    pub records: usize,
    /// Entity identifiers in the order their acquisition finished
    pub completion_order: Vec<String>,
}

impl AcquisitionSummary {
    fn new(source: Source, total: usize) -> Self {
        Self {
            source,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            total,
            written: 0,
            empty: 0,
            failed: 0,
            sink_errors: 0,
            records: 0,
            completion_order: Vec::with_capacity(total),
        }
    }
}

/// Drives one source adapter across every term
pub struct AcquisitionOrchestrator {
    adapter: Arc<dyn SourceAdapter>,
    settings: OrchestratorSettings,
}

impl AcquisitionOrchestrator {
    pub fn new(adapter: Arc<dyn SourceAdapter>, settings: OrchestratorSettings) -> Self {
        Self { adapter, settings }
    }

    /// Acquire every term and persist each result as it completes
    pub async fn run(&self, terms: Vec<CanonicalTerm>, sink: &dyn ResultSink) -> AcquisitionSummary {
        let source = self.adapter.source();
        let workers = self.settings.workers.max(1);
        let mut summary = AcquisitionSummary::new(source, terms.len());
        let start = Instant::now();

        info!(
            source = %source,
            entities = terms.len(),
            workers,
            pacing_secs = self.settings.pacing.as_secs_f64(),
            "Starting acquisition"
        );

        let mut results = stream::iter(terms)
            .map(|term| {
                let adapter = Arc::clone(&self.adapter);
                let entity = term.entity().to_string();
                let handle = tokio::spawn(async move { adapter.acquire(&term).await });
                async move { (entity, handle.await) }
            })
            .buffer_unordered(workers);

        while let Some((entity, joined)) = results.next().await {
            let set = match joined {
                Ok(Ok(set)) => set,
                Ok(Err(e)) => {
                    error!(entity = %entity, source = %source, error = %e, "Acquisition failed");
                    summary.failed += 1;
                    EntityResultSet::empty(entity.as_str(), source)
                }
                Err(e) => {
                    error!(
                        entity = %entity,
                        source = %source,
                        panicked = e.is_panic(),
                        error = %e,
                        "Acquisition task aborted"
                    );
                    summary.failed += 1;
                    EntityResultSet::empty(entity.as_str(), source)
                }
            };
            summary.completion_order.push(entity);

            if !self.settings.pacing.is_zero() {
                tokio::time::sleep(self.settings.pacing).await;
            }

            match sink.persist(&set) {
                Ok(SinkOutcome::Written { rows, .. }) => {
                    summary.written += 1;
                    summary.records += rows;
                }
                Ok(SinkOutcome::Skipped) => summary.empty += 1,
                Err(e) => {
                    warn!(entity = %set.entity, source = %source, error = %e, "Could not save records");
                    summary.sink_errors += 1;
                }
            }
        }

        summary.elapsed = start.elapsed();
        info!(
            source = %source,
            total = summary.total,
            written = summary.written,
            empty = summary.empty,
            failed = summary.failed,
            sink_errors = summary.sink_errors,
            records = summary.records,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            "Acquisition finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AcquireError, SinkError};
    use crate::types::NormalizedRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns one record per entity after a per-entity delay
    struct ScriptedAdapter;

    #[async_trait]
    impl SourceAdapter for ScriptedAdapter {
        fn source(&self) -> Source {
            Source::Literature
        }

        async fn acquire(&self, term: &CanonicalTerm) -> Result<EntityResultSet, AcquireError> {
            match term.entity() {
                "boom" => panic!("adapter bug"),
                "broken" => Err(AcquireError::Internal("unexpected".to_string())),
                "nothing" => Ok(EntityResultSet::empty(term.entity(), Source::Literature)),
                entity => {
                    let delay: u64 = entity.trim_start_matches("slow").len() as u64;
                    tokio::time::sleep(Duration::from_millis(100 * delay)).await;
                    Ok(EntityResultSet::new(
                        entity,
                        Source::Literature,
                        vec![NormalizedRecord::from_pairs(vec![(
                            "pmid",
                            entity.to_string(),
                        )])],
                    ))
                }
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        persisted: Mutex<Vec<(String, usize)>>,
    }

    impl ResultSink for MemorySink {
        fn persist(&self, set: &EntityResultSet) -> Result<SinkOutcome, SinkError> {
            if let Ok(mut persisted) = self.persisted.lock() {
                persisted.push((set.entity.clone(), set.len()));
            }
            if set.is_empty() {
                Ok(SinkOutcome::Skipped)
            } else {
                Ok(SinkOutcome::Written {
                    path: set.entity.clone().into(),
                    rows: set.len(),
                })
            }
        }
    }

    fn terms(names: &[&str]) -> Vec<CanonicalTerm> {
        names.iter().map(|n| CanonicalTerm::new(*n, *n)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_and_panics_do_not_abort_batch() {
        let orchestrator = AcquisitionOrchestrator::new(
            Arc::new(ScriptedAdapter),
            OrchestratorSettings {
                workers: 2,
                pacing: Duration::ZERO,
            },
        );
        let sink = MemorySink::default();

        let summary = orchestrator
            .run(terms(&["boom", "a", "broken", "nothing", "b"]), &sink)
            .await;

        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.empty, 3);
        assert_eq!(summary.records, 2);
        assert_eq!(sink.persisted.lock().unwrap().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_consumed_in_completion_order() {
        let orchestrator = AcquisitionOrchestrator::new(
            Arc::new(ScriptedAdapter),
            OrchestratorSettings {
                workers: 3,
                pacing: Duration::ZERO,
            },
        );
        let sink = MemorySink::default();

        let summary = orchestrator
            .run(terms(&["slow___", "slow_", "slow__"]), &sink)
            .await;

        assert_eq!(
            summary.completion_order,
            vec!["slow_".to_string(), "slow__".to_string(), "slow___".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_applied_after_every_result() {
        let orchestrator = AcquisitionOrchestrator::new(
            Arc::new(ScriptedAdapter),
            OrchestratorSettings {
                workers: 1,
                pacing: Duration::from_secs(5),
            },
        );
        let sink = MemorySink::default();
        let start = tokio::time::Instant::now();

        let summary = orchestrator.run(terms(&["nothing", "nothing", "nothing"]), &sink).await;

        assert_eq!(summary.empty, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_zero_workers_treated_as_one() {
        let orchestrator = AcquisitionOrchestrator::new(
            Arc::new(ScriptedAdapter),
            OrchestratorSettings {
                workers: 0,
                pacing: Duration::ZERO,
            },
        );
        let sink = MemorySink::default();
        let summary = orchestrator.run(terms(&["nothing"]), &sink).await;
        assert_eq!(summary.total, 1);
        assert_eq!(summary.empty, 1);
    }
}
