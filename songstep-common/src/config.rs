//! Configuration file model and data root resolution
//!
//! The TOML file is optional. A missing file is not an error: the services
//! start with compiled defaults and log a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name searched for in the user configuration directory
pub const CONFIG_FILE_NAME: &str = "songstep.toml";

/// Environment variable overriding the data root
pub const DATA_ROOT_ENV: &str = "SONGSTEP_DATA_ROOT";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; command-line flags and environment variables
/// take priority over values found here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP listen port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP bind address
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Root folder holding session directories and history
    #[serde(default)]
    pub data_root: Option<PathBuf>,

    /// Optional folder of static UI files
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Music provider base endpoint
    #[serde(default)]
    pub music_base_url: Option<String>,

    /// Music provider API key
    #[serde(default)]
    pub music_api_key: Option<String>,

    /// Music provider authentication header style ("bearer" or "x-api-key")
    #[serde(default)]
    pub music_auth_style: Option<String>,

    /// Deployment-wide callback URL for music submissions
    #[serde(default)]
    pub callback_url: Option<String>,

    /// DashScope (image/text) API key
    #[serde(default)]
    pub dashscope_api_key: Option<String>,

    /// DashScope base endpoint
    #[serde(default)]
    pub dashscope_base_url: Option<String>,

    /// Per-request upstream timeout in seconds
    #[serde(default)]
    pub upstream_timeout_secs: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the explicit file if given, else the default location
    ///
    /// Missing or unreadable files degrade to defaults with a warning.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(default_config_path);

        let Some(path) = candidate else {
            warn!("No configuration directory available, using built-in defaults");
            return Self::default();
        };

        if !path.exists() {
            if explicit.is_some() {
                warn!("Config file {} not found, using built-in defaults", path.display());
            }
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}; using built-in defaults", e);
                Self::default()
            }
        }
    }
}

/// `<config_dir>/songstep/songstep.toml` for the current user
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("songstep").join(CONFIG_FILE_NAME))
}

/// Data root resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config value
/// 4. OS-dependent default
pub fn resolve_data_root(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_data_root()
}

/// OS-dependent default data root
pub fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("songstep"))
        .unwrap_or_else(|| PathBuf::from("./songstep_data"))
}

/// Create the directory (and parents) if it does not exist yet
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created data root {}", path.display());
    }
    if !path.is_dir() {
        return Err(Error::Config(format!(
            "Data root is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}
