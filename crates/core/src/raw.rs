//! Raw account records as returned by the upstream query service.
//!
//! Addresses and amounts arrive as strings; they are normalized and parsed
//! during extraction, never coerced.

use serde::{Deserialize, Serialize};

/// One account record from the upstream snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccount {
    /// Account address (any hex case, optional `0x`).
    pub address: String,
    /// Tokens held by the account.
    pub holdings: Vec<RawHolding>,
    /// Trust limits where this account is involved as truster.
    pub outgoing_trust: Vec<RawTrustLimit>,
    /// Trust limits where this account is involved as trustee.
    pub incoming_trust: Vec<RawTrustLimit>,
}

/// A held token with its home account and balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHolding {
    /// Token contract address.
    pub token_address: String,
    /// Home account of the token.
    pub token_home_address: String,
    /// Balance as a decimal string in atomic subunits.
    pub balance: String,
}

/// A trust limit between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrustLimit {
    /// Trusting account.
    pub truster: String,
    /// Trusted account.
    pub trustee: String,
    /// Limit as a decimal string in atomic subunits.
    pub limit: String,
}
