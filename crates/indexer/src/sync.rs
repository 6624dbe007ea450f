//! Edge store synchronization.
//!
//! Diffs a freshly derived edge list against the stored edges and applies the
//! minimal changeset (insert / capacity update / delete) in one transaction.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};
use trustgraph_core::{DerivedEdge, EdgeKey, StoredEdge};

use crate::storage::{CapacityUpdate, Changeset, EdgeStore, StoreError};

/// Counts from one synchronization (observability only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Edges inserted.
    pub added: usize,
    /// Edges whose capacity was patched.
    pub updated: usize,
    /// Edges deleted.
    pub removed: usize,
    /// Edges already stored with the same capacity.
    pub unchanged: usize,
    /// Distinct edges in the new set.
    pub total: usize,
}

/// A changeset plus the number of stored edges left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Writes to apply.
    pub changeset: Changeset,
    /// New edges already stored with identical capacity.
    pub unchanged: usize,
}

impl Diff {
    /// Report for this diff.
    pub fn report(&self) -> SyncReport {
        let added = self.changeset.to_add.len();
        let updated = self.changeset.to_update.len();
        SyncReport {
            added,
            updated,
            removed: self.changeset.to_remove.len(),
            unchanged: self.unchanged,
            total: added + updated + self.unchanged,
        }
    }
}

/// Compute the changeset turning `stored` into `edges`.
///
/// Stored edges are matched by `(from, to, token)`. A repeated key in `edges`
/// is ignored after its first occurrence. Stored edges whose key is absent
/// from `edges` (or that duplicate an earlier stored key) are removed.
pub fn diff(stored: &[StoredEdge], edges: &[DerivedEdge]) -> Diff {
    let mut index: HashMap<EdgeKey, &StoredEdge> = HashMap::with_capacity(stored.len());
    for record in stored {
        index.entry(record.key()).or_insert(record);
    }

    let mut current: HashSet<EdgeKey> = HashSet::with_capacity(edges.len());
    let mut result = Diff::default();

    for edge in edges {
        let key = edge.key();
        if !current.insert(key) {
            continue;
        }

        match index.get(&key) {
            None => result.changeset.to_add.push(*edge),
            Some(record) if record.capacity != edge.capacity => {
                result.changeset.to_update.push(CapacityUpdate {
                    id: record.id,
                    capacity: edge.capacity,
                })
            }
            Some(_) => result.unchanged += 1,
        }
    }

    result.changeset.to_remove = stored
        .iter()
        .filter(|record| {
            let key = record.key();
            !current.contains(&key) || index.get(&key).map(|kept| kept.id) != Some(record.id)
        })
        .map(|record| record.id)
        .collect();

    result
}

/// Keeps an [`EdgeStore`] in sync with derived edge lists.
///
/// Calls to [`Synchronizer::synchronize`] on the same instance are serialized so
/// that two diffs never race on the same key space.
#[derive(Debug)]
pub struct Synchronizer<S> {
    store: S,
    lock: Mutex<()>,
}

impl<S: EdgeStore> Synchronizer<S> {
    /// Create a synchronizer over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bring the store in line with `edges`.
    ///
    /// # Errors
    ///
    /// Any load or write failure is returned as-is; the write is transactional,
    /// so a failed call leaves the store as it was. No retries are attempted.
    pub async fn synchronize(&self, edges: &[DerivedEdge]) -> Result<SyncReport, StoreError> {
        let _guard = self.lock.lock().await;

        let stored = self.store.list_edges().await?;
        let diff = diff(&stored, edges);
        let report = diff.report();

        debug!(
            stored = stored.len(),
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            "Computed edge changeset"
        );

        if !diff.changeset.is_empty() {
            self.store.apply_changeset(&diff.changeset).await?;
        }

        info!(
            "Edges synchronized: {} added, {} updated, {} removed, {} total",
            report.added, report.updated, report.removed, report.total
        );

        Ok(report)
    }
}
