//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use opsview_client::{ClientConfig, TlsVerify};
use opsview_core::ReconcilePolicy;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "OPSVIEW_CONFIG";

/// Top-level configuration for the opsview CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Opsview server connection
    #[serde(default)]
    pub opsview: OpsviewConfig,
    /// Loop bounds for reconciliation
    #[serde(default)]
    pub reconcile: ReconcilePolicy,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Opsview server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsviewConfig {
    /// Base URL, e.g. `https://opsview.example.com`
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Session token, used instead of the password when set
    pub token: Option<String>,
    /// Boolean or path to a CA bundle
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OpsviewConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            username: None,
            password: None,
            token: None,
            verify_ssl: default_verify_ssl(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_verify_ssl() -> String {
    "true".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read config {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// First existing file among the default locations
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let mut paths = vec![
            PathBuf::from("opsview.toml"),
            PathBuf::from("/etc/opsview/opsview.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("opsview/opsview.toml"));
        }

        paths.into_iter().find(|path| path.exists())
    }

    /// Client settings, requiring endpoint and username
    ///
    /// # Errors
    /// Returns error if the endpoint or username is missing, or `verify_ssl`
    /// is neither a boolean nor an existing file.
    pub fn client_config(&self) -> eyre::Result<ClientConfig> {
        let opsview = &self.opsview;
        let endpoint = opsview
            .endpoint
            .as_deref()
            .ok_or_else(|| eyre::eyre!("no Opsview endpoint configured"))?;
        let username = opsview
            .username
            .as_deref()
            .ok_or_else(|| eyre::eyre!("no Opsview username configured"))?;

        let mut client = ClientConfig::new(endpoint, username)
            .with_verify(TlsVerify::parse(&opsview.verify_ssl)?);
        client.password.clone_from(&opsview.password);
        client.token.clone_from(&opsview.token);
        client.timeout = Duration::from_secs(opsview.request_timeout_secs);

        Ok(client)
    }
}
