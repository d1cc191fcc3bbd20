//! Daemon configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the Unix socket the dashboard shell connects to.
    pub socket_path: PathBuf,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory for the SQLite database and other daemon data.
    pub data_dir: PathBuf,

    /// Database URL; derived from `data_dir` when not set.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Provider whose credential this deployment manages.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Application secret for the long-lived token exchange.
    ///
    /// When absent, `connect` saves the popup token as-is instead of
    /// exchanging it.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Deadline in seconds applied to store calls and the exchange flow.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_provider() -> String {
    "facebook".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let dirs = project_dirs();
        let data_dir = dirs
            .as_ref()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".adboard"));

        let socket_path = if cfg!(unix) {
            dirs.as_ref()
                .map(|d| d.runtime_dir().unwrap_or(d.data_dir()).join("adboard.sock"))
                .unwrap_or_else(|| PathBuf::from("/tmp/adboard.sock"))
        } else {
            PathBuf::from(r"\\.\pipe\adboard")
        };

        Self {
            socket_path,
            config_path: PathBuf::new(),
            data_dir,
            database_url: None,
            provider: default_provider(),
            app_secret: None,
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// The database URL, falling back to a SQLite file in `data_dir`.
    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            format!("sqlite://{}", self.data_dir.join("adboard.db").display())
        })
    }
}

/// Load configuration from the default location or create defaults.
pub fn load_config() -> Result<DaemonConfig> {
    let dirs = project_dirs();
    let config_path = dirs
        .as_ref()
        .map(|d| d.config_dir().join("daemon.toml"))
        .unwrap_or_else(|| PathBuf::from("adboard-daemon.toml"));

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        DaemonConfig::default()
    };

    config.config_path = config_path;

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "adboard", "adboard")
}
