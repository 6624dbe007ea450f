//! Periodic graph updater.
//!
//! Fetches the upstream snapshot, derives the edge list, synchronizes the edge
//! store and records the pass in the metrics table. The latest successful
//! summary is cached so status readers never block on a running pass.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};
use trustgraph_engine::{derive_from_raw, ExtractionStats};

use crate::source::AccountSource;
use crate::storage::Storage;
use crate::sync::{SyncReport, Synchronizer};

/// Metrics name under which each pass is recorded.
pub const GRAPH_UPDATE_METRICS: &str = "graph_update";

/// Outcome of one successful update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    /// Registry sizes from extraction.
    pub extraction: ExtractionStats,
    /// Edges produced by derivation.
    pub derived_edges: usize,
    /// Store changes applied.
    pub sync: SyncReport,
    /// Completion time (Unix timestamp).
    pub completed_at: i64,
}

/// Runs fetch, derive and synchronize on a fixed interval.
pub struct GraphUpdater<S> {
    source: Arc<S>,
    storage: Storage,
    synchronizer: Arc<Synchronizer<Storage>>,
    interval: Duration,
    last_summary: Arc<RwLock<Option<UpdateSummary>>>,
}

impl<S: AccountSource + Send + Sync> GraphUpdater<S> {
    /// Create an updater.
    ///
    /// # Arguments
    ///
    /// * `source` - Where snapshots come from
    /// * `storage` - Edge store and metrics sink
    /// * `interval` - Time between passes (must be > 0)
    pub fn new(source: S, storage: Storage, interval: Duration) -> Self {
        Self {
            source: Arc::new(source),
            synchronizer: Arc::new(Synchronizer::new(storage.clone())),
            storage,
            interval,
            last_summary: Arc::new(RwLock::new(None)),
        }
    }

    /// Run the updater loop.
    ///
    /// Runs indefinitely. A failed pass is logged and retried on the next tick.
    pub async fn run(&self) -> Result<()> {
        info!("Graph updater starting with interval: {:?}", self.interval);

        if let Err(e) = self.run_once().await {
            warn!("Initial graph update failed: {:#}", e);
        }

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // First tick completes immediately, skip it

        loop {
            interval.tick().await;

            if let Err(e) = self.run_once().await {
                warn!("Graph update failed: {:#}", e);
            }
        }
    }

    /// Perform a single pass.
    pub async fn run_once(&self) -> Result<UpdateSummary> {
        let records = self
            .source
            .fetch_accounts()
            .await
            .context("Failed to fetch account snapshot")?;

        let derivation = derive_from_raw(&records).context("Failed to derive edges")?;

        let sync = self
            .synchronizer
            .synchronize(&derivation.edges)
            .await
            .context("Failed to synchronize edge store")?;

        let summary = UpdateSummary {
            extraction: derivation.stats,
            derived_edges: derivation.edges.len(),
            sync,
            completed_at: chrono::Utc::now().timestamp(),
        };

        let payload = serde_json::to_value(summary).context("Failed to encode update summary")?;
        self.storage
            .record_metrics(GRAPH_UPDATE_METRICS, &payload)
            .await?;

        info!(
            "Graph update complete: {} accounts, {} edges ({} added, {} updated, {} removed)",
            summary.extraction.accounts,
            summary.derived_edges,
            summary.sync.added,
            summary.sync.updated,
            summary.sync.removed
        );

        *self.last_summary.write().await = Some(summary);

        Ok(summary)
    }

    /// Summary of the last successful pass, if any.
    pub async fn last_summary(&self) -> Option<UpdateSummary> {
        *self.last_summary.read().await
    }
}
