//! Configuration management for the trust graph indexer.
//!
//! This module handles loading configuration from:
//! - TOML files
//! - Environment variables (`${VAR}` references inside the TOML)
//! - Default values (fallbacks)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where account snapshots come from
    pub source: SourceConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Periodic updater configuration
    #[serde(default)]
    pub updater: UpdaterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Kind of account source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON snapshot on the local filesystem
    File,
    /// JSON snapshot served over HTTP(S)
    Http,
}

/// Account source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source kind: "file" or "http"
    pub kind: SourceKind,

    /// Snapshot path (required for `file`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Snapshot URL (required for `http`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://trustgraph.db")
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Periodic updater configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Seconds between graph updates.
    ///
    /// **Must be > 0** - tokio::time::interval panics on zero.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables can be referenced using `${VAR_NAME}` syntax,
    /// e.g. `url = "${SNAPSHOT_URL}"`. References on comment lines are left alone.
    ///
    /// # Example
    /// ```no_run
    /// # use trustgraph_indexer::config::Config;
    /// let config = Config::from_file("indexer.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        match self.source.kind {
            SourceKind::File => {
                let path = self
                    .source
                    .path
                    .as_ref()
                    .context("Source path is required for kind = \"file\"")?;
                if path.as_os_str().is_empty() {
                    anyhow::bail!("Source path cannot be empty");
                }
            }
            SourceKind::Http => {
                let url = self
                    .source
                    .url
                    .as_deref()
                    .context("Source url is required for kind = \"http\"")?;
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    anyhow::bail!("Source url must use http:// or https:// (got {url})");
                }
                if self.source.timeout_secs == 0 {
                    anyhow::bail!("Source timeout_secs must be > 0");
                }
            }
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be > 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot exceed max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.updater.interval_secs == 0 {
            anyhow::bail!("Updater interval_secs must be > 0 (tokio interval cannot be zero)");
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            anyhow::bail!("Unknown logging level: {}", self.logging.level);
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!(
                "Logging format must be \"json\" or \"pretty\" (got {})",
                self.logging.format
            );
        }

        Ok(())
    }
}

/// Replace `${VAR}` references with environment values.
///
/// Lines whose first non-blank character is `#` are copied verbatim.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());

    for (index, line) in input.split_inclusive('\n').enumerate() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let mut rest = line;
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .with_context(|| format!("Unclosed ${{ on line {}", index + 1))?;
            let name = &after[..end];
            if name.is_empty() {
                anyhow::bail!("Empty environment variable name on line {}", index + 1);
            }
            let value = std::env::var(name)
                .with_context(|| format!("Environment variable {name} is not set"))?;
            result.push_str(&value);
            rest = &after[end + 1..];
        }
        result.push_str(rest);
    }

    Ok(result)
}
