//! skg-crawl - Supplement data acquisition
//!
//! Reads the supplement list, resolves each entry to its canonical name, and
//! pulls records from the trial registry, the label database and the
//! literature index into `<root>/data/raw/<source>/<entity>.csv`.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use skg_common::config::{self as common_config, RootFolderInitializer, RootFolderResolver};
use skg_crawl::adapters::build_adapter;
use skg_crawl::config::{CrawlOverrides, SourceSettings};
use skg_crawl::services::{
    load_supplement_list, AcquisitionOrchestrator, CsvSink, NameResolver, OrchestratorSettings,
};
use skg_crawl::Source;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Which upstream source(s) to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    /// Clinical-trial registry
    Trials,
    /// Dietary supplement label database
    Labels,
    /// Biomedical literature index
    Literature,
    /// All three, one after another
    All,
}

impl SourceArg {
    fn sources(self) -> Vec<Source> {
        match self {
            SourceArg::Trials => vec![Source::ClinicalTrials],
            SourceArg::Labels => vec![Source::ProductLabels],
            SourceArg::Literature => vec![Source::Literature],
            SourceArg::All => Source::ALL.to_vec(),
        }
    }
}

/// Command-line arguments for skg-crawl
#[derive(Parser, Debug)]
#[command(name = "skg-crawl")]
#[command(about = "Acquire supplement records from public biomedical APIs")]
#[command(version)]
struct Args {
    /// Root folder holding config/ and data/
    #[arg(short, long, env = "SKG_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "SKG_CONFIG")]
    config: Option<PathBuf>,

    /// Supplement list (default: <root>/config/supplements.txt)
    #[arg(long, env = "SKG_SUPPLEMENTS")]
    supplements: Option<PathBuf>,

    /// Source to crawl
    #[arg(short, long, value_enum, default_value = "all")]
    source: SourceArg,

    /// Concurrent workers per source (1-5)
    #[arg(short, long, env = "SKG_WORKERS")]
    workers: Option<usize>,

    /// Delay after each completed entity, in seconds
    #[arg(long, env = "SKG_PACING_SECS")]
    pacing_secs: Option<u64>,

    /// Attempts per request
    #[arg(long, env = "SKG_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Also write logs to this file
    #[arg(long, env = "SKG_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = common_config::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(
        &toml_config.logging.level,
        args.log_file.clone().or_else(|| toml_config.logging.file.clone()),
    )?;

    info!("Starting skg-crawl v{}", env!("CARGO_PKG_VERSION"));
    match common_config::locate_config(args.config.as_deref()) {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => warn!("No config file found, using built-in defaults"),
    }

    let root = RootFolderResolver::new(args.root_folder.clone(), toml_config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root().display());

    let list_path = args
        .supplements
        .clone()
        .or_else(|| toml_config.supplements_file.clone())
        .unwrap_or_else(|| initializer.supplements_path());
    let entities = load_supplement_list(&list_path)
        .with_context(|| format!("Failed to load supplement list {}", list_path.display()))?;

    let resolver = NameResolver::with_overrides(&toml_config.names);
    let terms = resolver.resolve_all(&entities);

    let overrides = CrawlOverrides::merge(
        CrawlOverrides {
            workers: args.workers,
            pacing_secs: args.pacing_secs,
            max_retries: args.max_retries,
            user_agent: None,
        },
        &toml_config.crawler,
    );

    for source in args.source.sources() {
        let settings = SourceSettings::defaults(source).with_overrides(&overrides);
        let adapter = build_adapter(&settings)
            .with_context(|| format!("Failed to set up {} client", source))?;
        let sink = CsvSink::create(initializer.raw_data_dir(source.dir_name()))
            .with_context(|| format!("Failed to create output directory for {}", source))?;

        let orchestrator = AcquisitionOrchestrator::new(
            adapter,
            OrchestratorSettings {
                workers: settings.workers,
                pacing: settings.pacing,
            },
        );
        let summary = orchestrator.run(terms.clone(), &sink).await;

        if summary.failed > 0 || summary.sink_errors > 0 {
            warn!(
                source = %source,
                failed = summary.failed,
                sink_errors = summary.sink_errors,
                "Some entities could not be processed"
            );
        }
        info!(
            source = %source,
            written = summary.written,
            empty = summary.empty,
            records = summary.records,
            output = %sink.dir().display(),
            "Source complete"
        );
    }

    info!("skg-crawl finished");
    Ok(())
}

/// Console logging plus an optional uncolored copy to a file
fn init_tracing(level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}
