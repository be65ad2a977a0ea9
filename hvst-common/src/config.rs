//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a small TOML file. Every field has a
//! compiled default, so a missing file is never fatal: the loader logs a
//! warning and carries on with defaults.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `HVST_ROOT_FOLDER` (or legacy `HVST_ROOT`) environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ROOT_FOLDER_ENV: &str = "HVST_ROOT_FOLDER";

/// Legacy root folder environment variable, consulted after [`ROOT_FOLDER_ENV`]
pub const ROOT_ENV: &str = "HVST_ROOT";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding project working areas
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote catalog connection settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Upload settings
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Remote catalog connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog site, e.g. `https://redacted.sh`
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    /// API key sent in the `Authorization` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Minimum interval between two catalog requests
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            api_key: None,
            request_interval_ms: default_request_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Value of the `source` info key stamped into created torrents
    #[serde(default = "default_announce_source")]
    pub announce_source: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            announce_source: default_announce_source(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_catalog_url() -> String {
    "https://redacted.sh".to_string()
}

fn default_request_interval_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_announce_source() -> String {
    "RED".to_string()
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/hvst (or /var/lib/hvst for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("hvst"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/hvst"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("hvst"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/hvst"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("hvst"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\hvst"))
    } else {
        PathBuf::from("./hvst_data")
    }
}

/// Candidate config file paths for a module, in lookup order
fn config_file_candidates(module_name: &str) -> Vec<PathBuf> {
    let file_name = format!("{}.toml", module_name);
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("hvst").join(&file_name));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/hvst").join(&file_name));
    }

    candidates
}

/// Load the TOML bootstrap config
///
/// With an explicit path the file must exist and parse. Without one, the
/// per-module default locations are tried and a missing file falls back to
/// defaults with a warning.
pub fn load_toml_config(explicit_path: Option<&Path>, module_name: &str) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        return read_toml_config(path);
    }

    for candidate in config_file_candidates(module_name) {
        if candidate.exists() {
            debug!(path = %candidate.display(), "Loading config file");
            return read_toml_config(&candidate);
        }
    }

    warn!(
        module = module_name,
        "No config file found, using compiled defaults"
    );
    Ok(TomlConfig::default())
}

fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Root folder resolver
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    /// Config already loaded by the caller; `None` means look it up
    loaded_config: Option<TomlConfig>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            loaded_config: None,
        }
    }

    /// Use an already loaded config instead of searching the default locations
    pub fn with_config(mut self, config: &TomlConfig) -> Self {
        self.loaded_config = Some(config.clone());
        self
    }

    /// Set the command-line override (highest priority)
    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// Resolve the root folder. Never fails: falls back to the compiled default.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        let config = match &self.loaded_config {
            Some(config) => Ok(config.clone()),
            None => load_toml_config(None, &self.module_name),
        };
        match config {
            Ok(TomlConfig {
                root_folder: Some(root_folder),
                ..
            }) => return root_folder,
            Ok(_) => {}
            Err(e) => {
                warn!(module = %self.module_name, error = %e, "Ignoring unreadable config file");
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and exposes well-known paths under it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder (and parents). Idempotent.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Directory under which per-project step working areas are created
    pub fn work_areas_path(&self) -> PathBuf {
        self.root_folder.join("projects")
    }
}
