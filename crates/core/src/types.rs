//! Core types for the trust graph.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token balance held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Token contract address.
    pub token: Address,
    /// Balance in atomic subunits (18 decimals).
    pub balance: U256,
}

/// A participant in the trust network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Normalized account address.
    pub address: Address,
    /// Held tokens in upstream order (duplicates are kept).
    pub holdings: Vec<Holding>,
}

/// A token and the account that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token contract address.
    pub address: Address,
    /// Home account (issuer / owner of record).
    pub home: Address,
}

/// Where a trust connection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    /// Trust limit reported by the upstream source.
    Explicit,
    /// Synthesized from a holding: the holder can return the token to its home account.
    Ownership,
}

impl ConnectionKind {
    /// String representation used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Explicit => "explicit",
            ConnectionKind::Ownership => "ownership",
        }
    }
}

/// A directed trust connection with a full-precision limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustConnection {
    /// The trusting side.
    pub truster: Address,
    /// The trusted side.
    pub trustee: Address,
    /// Limit in atomic subunits (pre-scaling).
    pub limit: U256,
    /// Origin of the connection.
    pub kind: ConnectionKind,
}

impl TrustConnection {
    /// Create an explicit connection.
    pub fn explicit(truster: Address, trustee: Address, limit: U256) -> Self {
        Self {
            truster,
            trustee,
            limit,
            kind: ConnectionKind::Explicit,
        }
    }

    /// Create an implicit ownership connection (holder -> token home).
    pub fn ownership(holder: Address, home: Address, balance: U256) -> Self {
        Self {
            truster: holder,
            trustee: home,
            limit: balance,
            kind: ConnectionKind::Ownership,
        }
    }

    /// Uniqueness key `(truster, trustee)`.
    pub fn key(&self) -> (Address, Address) {
        (self.truster, self.trustee)
    }
}

/// Uniqueness key of an edge: `(from, to, token)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    /// Sending account.
    pub from: Address,
    /// Receiving account.
    pub to: Address,
    /// Home account of the transferred token.
    pub token: Address,
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]", self.from, self.to, self.token)
    }
}

/// A directed, capacity-weighted, token-scoped edge from one derivation pass.
///
/// `token` is the **home account** of the transferred token, not the token
/// contract address; the path solver treats a token as its home account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedEdge {
    /// Sending account.
    pub from: Address,
    /// Receiving account.
    pub to: Address,
    /// Home account of the transferred token.
    pub token: Address,
    /// Capacity in whole units (always > 0).
    pub capacity: u64,
}

impl DerivedEdge {
    /// Uniqueness key of this edge.
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from,
            to: self.to,
            token: self.token,
        }
    }
}

/// Storage-assigned edge identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub i64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEdge {
    /// Storage identity, used to target updates and deletes.
    pub id: EdgeId,
    /// Sending account.
    pub from: Address,
    /// Receiving account.
    pub to: Address,
    /// Home account of the transferred token.
    pub token: Address,
    /// Capacity in whole units.
    pub capacity: u64,
}

impl StoredEdge {
    /// Uniqueness key of this edge.
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from,
            to: self.to,
            token: self.token,
        }
    }

    /// The edge without its storage identity.
    pub fn edge(&self) -> DerivedEdge {
        DerivedEdge {
            from: self.from,
            to: self.to,
            token: self.token,
            capacity: self.capacity,
        }
    }
}
