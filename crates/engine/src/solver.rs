//! Seam for the external transfer-path solver.
//!
//! The max-flow computation itself lives outside this workspace. This module
//! defines what it consumes and produces, and enforces the preconditions
//! before handing a graph over.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::graph::TransferGraph;

/// A transfer to plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Sending account.
    pub from: Address,
    /// Receiving account.
    pub to: Address,
    /// Amount in whole units.
    pub amount: u64,
}

/// One hop of a transfer plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferStep {
    /// Sending account.
    pub from: Address,
    /// Receiving account.
    pub to: Address,
    /// Home account of the token moved.
    pub token: Address,
    /// Amount moved on this hop.
    pub value: u64,
}

/// A path plan returned by the solver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPlan {
    /// Maximum amount that can flow from sender to receiver.
    pub max_flow: u64,
    /// Steps to execute, in order.
    pub steps: Vec<TransferStep>,
}

/// External path solver.
pub trait PathSolver {
    /// Solver-specific failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Compute a plan for `request` over `graph`.
    fn solve(
        &self,
        graph: &TransferGraph,
        request: &TransferRequest,
    ) -> Result<TransferPlan, Self::Error>;
}

/// Planning errors.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// No nodes to compute a path over.
    #[error("Graph is empty - no nodes available for path computation")]
    EmptyGraph,

    /// The request cannot be planned as given.
    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),

    /// The solver failed; its error is passed through untouched.
    #[error("Path solver failed: {0}")]
    Solver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Plan a transfer with `solver`.
///
/// An empty graph is a precondition failure, not "no path found".
pub fn plan_transfer<S: PathSolver>(
    solver: &S,
    graph: &TransferGraph,
    request: &TransferRequest,
) -> Result<TransferPlan, PlanError> {
    if graph.ensure_not_empty().is_err() {
        return Err(PlanError::EmptyGraph);
    }
    if request.amount == 0 {
        return Err(PlanError::InvalidRequest(
            "amount must be greater than zero".to_string(),
        ));
    }

    solver
        .solve(graph, request)
        .map_err(|e| PlanError::Solver(Box::new(e)))
}
