//! TrustGraph derivation engine.
//!
//! This crate turns a raw trust-network snapshot into the capacity graph the
//! transfer-path solver runs on. It is pure and synchronous:
//! - Extraction: raw records => accounts, tokens, trust connections
//! - Derivation: registries => deduplicated `(from, to, token)` edges with
//!   whole-unit capacities
//! - Graph: edge list + node set, with the empty-graph precondition
//! - Solver seam: `PathSolver` for the external max-flow implementation

#![warn(missing_docs)]

pub mod derive;
pub mod extract;
pub mod graph;
pub mod solver;

pub use derive::{derive_edges, derive_from_raw, Derivation};
pub use extract::{extract, ExtractionStats, Registries};
pub use graph::TransferGraph;
pub use solver::{
    plan_transfer, PathSolver, PlanError, TransferPlan, TransferRequest, TransferStep,
};
