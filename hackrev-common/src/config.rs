//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. A missing file is not
//! fatal: a warning is logged and compiled defaults are used.
//!
//! Root folder resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`HACKREV_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "HACKREV_ROOT_FOLDER";

/// File name of the ledger database inside the root folder
pub const DATABASE_FILE_NAME: &str = "hackrev.db";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The service must restart
/// to pick up changes to the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the ledger database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP bind address
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Fan-out search configuration (optional)
    #[serde(default)]
    pub search: SearchConfig,

    /// Persistence configuration (optional)
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            bind_host: default_bind_host(),
            logging: LoggingConfig::default(),
            search: SearchConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
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

/// Fan-out search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Deadline for one fan-out search; outstanding tags are reported as timed out
    #[serde(default = "default_fanout_timeout_ms")]
    pub fanout_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fanout_timeout_ms: default_fanout_timeout_ms(),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Keep the ledger in memory only (nothing survives a restart)
    #[serde(default)]
    pub in_memory: bool,
}

fn default_port() -> u16 {
    5780
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fanout_timeout_ms() -> u64 {
    2000
}

/// Load bootstrap configuration from a TOML file
///
/// A missing file yields defaults (with a warning); a file that exists but
/// cannot be read or parsed is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Platform config file location (`<config dir>/hackrev/hackrev.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("hackrev").join("hackrev.toml"))
        .unwrap_or_else(|| PathBuf::from("hackrev.toml"))
}

/// Get OS-dependent default root folder path
pub fn get_default_root_folder() -> PathBuf {
    // ~/.local/share/hackrev, ~/Library/Application Support/hackrev, %LOCALAPPDATA%\hackrev
    dirs::data_local_dir()
        .map(|d| d.join("hackrev"))
        .unwrap_or_else(|| PathBuf::from("./hackrev_data"))
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// TOML `root_folder` (priority 3)
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("{}: root folder {} (command line)", self.module_name, path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("{}: root folder {} ({})", self.module_name, path, ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!("{}: root folder {} (TOML config)", self.module_name, path.display());
            return path.clone();
        }

        let path = get_default_root_folder();
        info!("{}: root folder {} (compiled default)", self.module_name, path.display());
        path
    }
}

/// Creates the root folder and locates files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder (and parents) if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}
