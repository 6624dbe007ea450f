//! Upstream account sources.
//!
//! A source returns the raw account snapshot the derivation runs on. Two shapes
//! are accepted: `{"accounts": [...]}` and a bare JSON array of records.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use trustgraph_core::RawAccount;

use crate::config::{SourceConfig, SourceKind};

/// Something that can produce a raw account snapshot.
pub trait AccountSource {
    /// Fetch the full snapshot.
    fn fetch_accounts(&self) -> impl Future<Output = Result<Vec<RawAccount>>> + Send;
}

/// Decode a snapshot document.
pub fn parse_snapshot(bytes: &[u8]) -> Result<Vec<RawAccount>> {
    let json: Value = serde_json::from_slice(bytes).context("Invalid snapshot JSON")?;

    let records = match json {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut object) => object
            .remove("accounts")
            .context("Snapshot object has no \"accounts\" field")?,
        _ => anyhow::bail!("Snapshot must be an array or an object with \"accounts\""),
    };

    serde_json::from_value(records).context("Invalid account record in snapshot")
}

/// Snapshot stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Read snapshots from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AccountSource for FileSource {
    async fn fetch_accounts(&self) -> Result<Vec<RawAccount>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read snapshot: {}", self.path.display()))?;
        let accounts = parse_snapshot(&bytes)?;
        debug!(path = %self.path.display(), accounts = accounts.len(), "Loaded snapshot file");
        Ok(accounts)
    }
}

/// Snapshot served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    /// Build a source for `url` with the given request timeout.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("trustgraph-indexer/source")
            .build()
            .context("Failed to build account source HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl AccountSource for HttpSource {
    async fn fetch_accounts(&self) -> Result<Vec<RawAccount>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch snapshot from {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Snapshot request to {} returned {}", self.url, status);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read snapshot response")?;
        let accounts = parse_snapshot(&bytes)?;
        debug!(url = %self.url, accounts = accounts.len(), "Fetched snapshot");
        Ok(accounts)
    }
}

/// Source selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredSource {
    /// Local file
    File(FileSource),
    /// HTTP endpoint
    Http(HttpSource),
}

impl ConfiguredSource {
    /// Build the source described by `config`.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        match config.kind {
            SourceKind::File => {
                let path = config
                    .path
                    .clone()
                    .context("Source path is required for kind = \"file\"")?;
                Ok(Self::File(FileSource::new(path)))
            }
            SourceKind::Http => {
                let url = config
                    .url
                    .clone()
                    .context("Source url is required for kind = \"http\"")?;
                Ok(Self::Http(HttpSource::new(url, config.timeout_secs)?))
            }
        }
    }
}

impl AccountSource for ConfiguredSource {
    async fn fetch_accounts(&self) -> Result<Vec<RawAccount>> {
        match self {
            Self::File(source) => source.fetch_accounts().await,
            Self::Http(source) => source.fetch_accounts().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RECORD: &str = r#"{
        "address": "0x1111111111111111111111111111111111111111",
        "holdings": [],
        "outgoingTrust": [],
        "incomingTrust": []
    }"#;

    #[test]
    fn test_parse_wrapped_and_bare_snapshots() {
        let wrapped = format!(r#"{{"accounts": [{RECORD}]}}"#);
        let bare = format!("[{RECORD}]");

        let a = parse_snapshot(wrapped.as_bytes()).unwrap();
        let b = parse_snapshot(bare.as_bytes()).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(parse_snapshot(b"not json").is_err());
        assert!(parse_snapshot(br#"{"records": []}"#).is_err());
        assert!(parse_snapshot(b"42").is_err());
        // Missing required fields.
        assert!(parse_snapshot(br#"[{"address": "0x11"}]"#).is_err());
    }

    #[tokio::test]
    async fn test_file_source() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[{RECORD}, {RECORD}]").unwrap();

        let source = FileSource::new(file.path());
        let accounts = source.fetch_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let source = FileSource::new("/nonexistent/trustgraph/snapshot.json");
        let err = source.fetch_accounts().await.unwrap_err();
        assert!(err.to_string().contains("Failed to read snapshot"));
    }

    #[test]
    fn test_configured_source_selection() {
        let config = SourceConfig {
            kind: SourceKind::Http,
            path: None,
            url: Some("https://example.com/accounts.json".to_string()),
            timeout_secs: 5,
        };
        assert!(matches!(
            ConfiguredSource::from_config(&config).unwrap(),
            ConfiguredSource::Http(_)
        ));

        let config = SourceConfig {
            kind: SourceKind::File,
            path: None,
            url: None,
            timeout_secs: 5,
        };
        assert!(ConfiguredSource::from_config(&config).is_err());
    }
}
