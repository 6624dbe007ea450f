//! Solver-facing transfer graph.

use std::collections::BTreeSet;

use alloy_primitives::Address;
use trustgraph_core::{CoreError, DerivedEdge, Result, StoredEdge};

/// Edge list plus the distinct node set, as consumed by the path solver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferGraph {
    edges: Vec<DerivedEdge>,
    nodes: Vec<Address>,
}

impl TransferGraph {
    /// Build a graph from edges; nodes are every `from`, `to` and `token`, sorted.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = DerivedEdge>,
    {
        let edges: Vec<DerivedEdge> = edges.into_iter().collect();
        let nodes: BTreeSet<Address> = edges.iter().flat_map(|e| [e.from, e.to, e.token]).collect();

        Self {
            edges,
            nodes: nodes.into_iter().collect(),
        }
    }

    /// Build a graph from persisted edges.
    pub fn from_stored(edges: &[StoredEdge]) -> Self {
        Self::from_edges(edges.iter().map(StoredEdge::edge))
    }

    /// The edges.
    pub fn edges(&self) -> &[DerivedEdge] {
        &self.edges
    }

    /// The distinct node addresses, sorted.
    pub fn nodes(&self) -> &[Address] {
        &self.nodes
    }

    /// Whether `address` appears in the graph.
    pub fn contains_node(&self, address: &Address) -> bool {
        self.nodes.binary_search(address).is_ok()
    }

    /// Fail with `CoreError::EmptyGraph` if there are no nodes.
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(CoreError::EmptyGraph);
        }
        Ok(())
    }
}
