//! Error types for the core crate.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Address is not a 20-byte hex string.
    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    /// Amount is not a non-negative decimal integer.
    #[error("Invalid amount: {0:?} (expected a non-negative decimal integer)")]
    InvalidAmount(String),

    /// A raw account record failed validation.
    #[error("Malformed record for account {account}: {source}")]
    MalformedRecord {
        /// The account address as received.
        account: String,
        /// What was wrong with the record.
        #[source]
        source: Box<CoreError>,
    },

    /// Scaled capacity does not fit the storable range.
    #[error("Capacity overflow: raw capacity {0} exceeds the storable range after scaling")]
    CapacityOverflow(U256),

    /// A candidate edge's capacity could not be scaled.
    #[error("Capacity overflow on edge {from} -> {to} (token home {token}): {source}")]
    EdgeCapacityOverflow {
        /// Sending account.
        from: Address,
        /// Receiving account.
        to: Address,
        /// Token home account.
        token: Address,
        /// The underlying scaling error.
        #[source]
        source: Box<CoreError>,
    },

    /// The graph has no nodes.
    #[error("Graph is empty - no nodes available for path computation")]
    EmptyGraph,
}

impl CoreError {
    /// Wrap an error with the account it was raised for.
    pub fn in_record(self, account: impl Into<String>) -> Self {
        CoreError::MalformedRecord {
            account: account.into(),
            source: Box::new(self),
        }
    }

    /// Attach the candidate edge a capacity error was raised for.
    pub fn on_edge(self, from: Address, to: Address, token: Address) -> Self {
        CoreError::EdgeCapacityOverflow {
            from,
            to,
            token,
            source: Box::new(self),
        }
    }

    /// Whether this error reports malformed upstream input.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidAddress(_)
                | CoreError::InvalidAmount(_)
                | CoreError::MalformedRecord { .. }
        )
    }
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
