//! Account / token / connection extraction.
//!
//! Folds raw account records into three registries. Registries keep insertion
//! order for deterministic first-wins behavior and are hash-indexed for lookup.

use std::collections::{HashMap, HashSet};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use trustgraph_core::{
    normalize_address, parse_amount, Account, Holding, RawAccount, RawTrustLimit, Result, Token,
    TrustConnection,
};

/// Registry sizes after extraction (informational).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Number of distinct accounts.
    pub accounts: usize,
    /// Number of registered trust connections.
    pub connections: usize,
    /// Number of distinct tokens.
    pub tokens: usize,
}

/// The three registries built from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    accounts: Vec<Account>,
    account_index: HashMap<Address, usize>,
    tokens: Vec<Token>,
    token_index: HashMap<Address, usize>,
    connections: Vec<TrustConnection>,
}

impl Registries {
    /// Accounts in first-seen order.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Tokens in first-seen order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Explicit trust connections in registration order.
    pub fn connections(&self) -> &[TrustConnection] {
        &self.connections
    }

    /// Look up an account by address.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.account_index.get(address).map(|&i| &self.accounts[i])
    }

    /// Look up a token by contract address.
    pub fn token(&self, address: &Address) -> Option<&Token> {
        self.token_index.get(address).map(|&i| &self.tokens[i])
    }

    /// Registry sizes.
    pub fn stats(&self) -> ExtractionStats {
        ExtractionStats {
            accounts: self.accounts.len(),
            connections: self.connections.len(),
            tokens: self.tokens.len(),
        }
    }
}

/// A raw record after validation, before registration.
struct ParsedAccount {
    address: Address,
    holdings: Vec<(Holding, Address)>,
    trust: Vec<TrustConnection>,
}

impl ParsedAccount {
    fn parse(raw: &RawAccount) -> Result<Self> {
        let address = normalize_address(&raw.address).map_err(|e| e.in_record(&raw.address))?;

        let holdings = raw
            .holdings
            .iter()
            .map(|h| {
                let token = normalize_address(&h.token_address)?;
                let home = normalize_address(&h.token_home_address)?;
                let balance = parse_amount(&h.balance)?;
                Ok((Holding { token, balance }, home))
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.in_record(&raw.address))?;

        let trust = raw
            .outgoing_trust
            .iter()
            .chain(raw.incoming_trust.iter())
            .map(parse_trust_limit)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.in_record(&raw.address))?;

        Ok(Self {
            address,
            holdings,
            trust,
        })
    }
}

fn parse_trust_limit(raw: &RawTrustLimit) -> Result<TrustConnection> {
    Ok(TrustConnection::explicit(
        normalize_address(&raw.truster)?,
        normalize_address(&raw.trustee)?,
        parse_amount(&raw.limit)?,
    ))
}

/// Locally-owned accumulator threaded through the extraction fold.
#[derive(Debug, Default)]
struct RegistryBuilder {
    registries: Registries,
}

impl RegistryBuilder {
    fn with_account(mut self, raw: &RawAccount) -> Result<Self> {
        let parsed = ParsedAccount::parse(raw)?;
        let reg = &mut self.registries;

        // First occurrence wins for the account and everything it contributes.
        if reg.account_index.contains_key(&parsed.address) {
            return Ok(self);
        }

        let mut holdings = Vec::with_capacity(parsed.holdings.len());
        for (holding, home) in parsed.holdings {
            if !reg.token_index.contains_key(&holding.token) {
                reg.token_index.insert(holding.token, reg.tokens.len());
                reg.tokens.push(Token {
                    address: holding.token,
                    home,
                });
            }
            holdings.push(holding);
        }

        reg.account_index.insert(parsed.address, reg.accounts.len());
        reg.accounts.push(Account {
            address: parsed.address,
            holdings,
        });

        // Duplicates are only dropped within this account's batch; a pair already
        // registered by an earlier account is registered again.
        let mut batch_keys = HashSet::with_capacity(parsed.trust.len());
        for connection in parsed.trust {
            if batch_keys.insert(connection.key()) {
                reg.connections.push(connection);
            }
        }

        Ok(self)
    }

    fn finish(self) -> Registries {
        self.registries
    }
}

/// Build the registries from raw account records.
///
/// # Errors
///
/// Fails with a malformed-input error (`CoreError::MalformedRecord`) naming the
/// first record whose address, token addresses, balances or trust limits do not
/// parse. Duplicate records are validated too before being skipped.
pub fn extract<'a, I>(records: I) -> Result<Registries>
where
    I: IntoIterator<Item = &'a RawAccount>,
{
    records
        .into_iter()
        .try_fold(RegistryBuilder::default(), RegistryBuilder::with_account)
        .map(RegistryBuilder::finish)
}
