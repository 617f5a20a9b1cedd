//! Configuration loading and root folder resolution
//!
//! Bootstrap settings live in a single TOML file. Every key is optional so a
//! missing or partial file degrades to compiled defaults instead of aborting.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SKG_ROOT_FOLDER";

/// Root folder used by CI checkouts
pub const WORKSPACE_ENV: &str = "GITHUB_WORKSPACE";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding `config/` and `data/`
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Entity list, one identifier per line
    #[serde(default)]
    pub supplements_file: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Crawler tuning overrides
    #[serde(default)]
    pub crawler: CrawlerSection,

    /// Localized identifier → canonical external term
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[crawler]` table; unset keys fall back to per-source defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlerSection {
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub pacing_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Per-user config file location (`~/.config/skg/skg-crawl.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("skg").join("skg-crawl.toml"))
}

/// Config file a run will read, if any
///
/// An explicit path is returned as given; otherwise the per-user default
/// file is used only when it exists.
pub fn locate_config(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.exists()),
    }
}

/// Load the bootstrap config
///
/// An explicitly requested file must exist and parse. The per-user default
/// file is optional: when absent, compiled defaults are used. Nothing is
/// logged here since callers usually load config before installing a
/// subscriber; pair with [`locate_config`] to report the source.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    }

    match locate_config(explicit) {
        Some(path) => load_toml_config(&path),
        None => Ok(TomlConfig::default()),
    }
}

/// Root folder resolution
///
/// Priority order:
/// 1. Command-line argument (highest priority)
/// 2. `SKG_ROOT_FOLDER`
/// 3. `GITHUB_WORKSPACE` (CI checkouts)
/// 4. TOML `root_folder`
/// 5. OS-dependent compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_root: Option<PathBuf>) -> Self {
        Self { cli_arg, toml_root }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, WORKSPACE_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("skg"))
        .unwrap_or_else(|| PathBuf::from("./skg_data"))
}

/// Creates and hands out the standard directories under the root folder
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            info!("Creating root folder: {}", self.root.display());
        }
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// `<root>/data/raw/<source_dir>`
    pub fn raw_data_dir(&self, source_dir: &str) -> PathBuf {
        self.root.join("data").join("raw").join(source_dir)
    }

    /// `<root>/config/supplements.txt`
    pub fn supplements_path(&self) -> PathBuf {
        self.root.join("config").join("supplements.txt")
    }
}

/// User-Agent sent with every outbound request
pub fn get_user_agent() -> String {
    format!("skg-crawl/{} (supplement knowledge graph)", env!("CARGO_PKG_VERSION"))
}
