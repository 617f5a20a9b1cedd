//! Acquisition services
//!
//! Leaves first: name resolution and list loading, the resilient request
//! client with its pacing clock, XML tree parsing, CSV output, and the
//! orchestrator that ties adapters to the sink.

pub mod acquisition_orchestrator;
pub mod csv_sink;
pub mod name_resolver;
pub mod rate_limiter;
pub mod request_client;
pub mod supplement_list;
pub mod xml_tree;

pub use acquisition_orchestrator::{AcquisitionOrchestrator, AcquisitionSummary, OrchestratorSettings};
pub use csv_sink::{CsvSink, ResultSink, SinkOutcome};
pub use name_resolver::NameResolver;
pub use rate_limiter::RequestPacer;
pub use request_client::{BackoffPolicy, CallBudget, RequestClient, RequestSpec};
pub use supplement_list::{load_supplement_list, parse_supplement_list};
