//! # TrustGraph Core
//!
//! Core types, address normalization and capacity scaling for the trust-graph
//! derivation engine.
//!
//! This crate provides the building blocks shared by the engine and the indexer:
//!
//! - **Addresses**: EVM addresses (Alloy primitives), normalized on ingestion
//! - **Registries**: Account, Token and TrustConnection records
//! - **Edges**: DerivedEdge (one derivation pass) and StoredEdge (persisted)
//! - **Raw records**: the upstream account snapshot shape
//! - **Capacity**: fixed-point (18 decimals) down-scaling to whole units

#![warn(missing_docs)]

pub mod address;
pub mod capacity;
pub mod constants;
pub mod error;
pub mod raw;
pub mod types;

// Re-export commonly used items
pub use address::{normalize_address, parse_amount};
pub use capacity::scale_capacity;
pub use constants::*;
pub use error::{CoreError, Result};
pub use raw::{RawAccount, RawHolding, RawTrustLimit};
pub use types::*;

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, U256};
