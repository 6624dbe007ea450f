//! Trust graph edge indexing.
//!
//! This crate provides:
//! - Upstream account sources (JSON file or HTTP snapshot)
//! - SQLite edge store with transactional changesets
//! - Edge store synchronization (diff + atomic apply)
//! - Periodic graph updater and metrics sink
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────┐
//! │  trustgraph-indexer (this)        │
//! │                                   │
//! │  ┌────────────────┐               │
//! │  │ Account Source │ ← file / HTTP snapshot
//! │  └───────┬────────┘               │
//! │          │ raw records            │
//! │  ┌───────▼────────┐               │
//! │  │ trustgraph-    │ extract +     │
//! │  │ engine         │ derive edges  │
//! │  └───────┬────────┘               │
//! │          │ derived edges          │
//! │  ┌───────▼────────┐               │
//! │  │ Synchronizer   │ diff → one    │
//! │  │                │ transaction   │
//! │  └───────┬────────┘               │
//! │          │                        │
//! │     ┌────▼──────┐                 │
//! │     │  Storage  │ ← SQLite        │
//! │     │ (edges,   │                 │
//! │     │  metrics) │                 │
//! │     └───────────┘                 │
//! └───────────────────────────────────┘
//! ```
//!
//! The transfer-path solver reads the stored edges through
//! [`storage::Storage::load_transfer_graph`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod source;
pub mod storage;
pub mod sync;
pub mod updater;

// Re-export common types
pub use trustgraph_core::*;
