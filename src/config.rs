use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    /// Built in declaration order; a set may only reference tags declared
    /// before it.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PluginConfig {
    pub tag: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    #[serde(default)]
    pub args: SetArgs,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    DomainSet,
    IpSet,
}

/// Sources of one domain or IP set.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SetArgs {
    /// Inline rules. IP sets also accept the key `ips`.
    #[serde(default, alias = "ips")]
    pub exps: Vec<String>,
    /// Tags of other providers of the same key type.
    #[serde(default)]
    pub sets: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub remote_files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub url: String,
    pub path: String,
    /// Refresh period in seconds; 0 disables background refresh.
    #[serde(default)]
    pub interval: u64,
}

// Defaults
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_user_agent() -> String {
    concat!("setkeeper/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config TOML")?;
        Ok(config)
    }
}
