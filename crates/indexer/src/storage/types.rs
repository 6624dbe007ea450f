//! Database types for the indexer storage layer.

use serde::{Deserialize, Serialize};
use trustgraph_core::{DerivedEdge, EdgeId};

/// Capacity patch for one stored edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityUpdate {
    /// Identity of the stored edge.
    pub id: EdgeId,
    /// New capacity in whole units.
    pub capacity: u64,
}

/// The writes needed to bring the edge table in line with a derivation pass.
///
/// Applied as a single transaction: all three parts take effect or none do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    /// Edges to insert.
    pub to_add: Vec<DerivedEdge>,
    /// Capacities to patch in place.
    pub to_update: Vec<CapacityUpdate>,
    /// Stored edges to delete.
    pub to_remove: Vec<EdgeId>,
}

impl Changeset {
    /// True when nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// A named metrics payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    /// Payload name.
    pub name: String,
    /// Opaque JSON payload.
    pub payload: serde_json::Value,
    /// Unix timestamp of the last write.
    pub updated_at: i64,
}
