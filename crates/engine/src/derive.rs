//! Edge derivation.
//!
//! Combines the registries into directed, capacity-weighted, token-scoped edges:
//!
//! 1. Every holding synthesizes an ownership connection `holder -> token home`
//!    (limit = balance), appended after the explicit connections.
//! 2. For each sender and each token it holds with a positive balance, every
//!    connection whose truster is the token's home account yields a candidate
//!    edge `sender -> trustee` with raw capacity `min(limit, balance)`. The
//!    sender's own ownership connections toward that home account are
//!    candidates too, so a token can always be returned to its home account.
//! 3. Raw capacities are scaled to whole units (floor of `raw / 10^18`).
//! 4. Self-loops, zero scaled capacities and repeated `(from, to, token)` keys
//!    are dropped; the first candidate for a key wins.
//!
//! Traversal order is account order, then holding order, then working-set order
//! of the connections, which makes first-wins reproducible for a given input.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trustgraph_core::{
    scale_capacity, ConnectionKind, DerivedEdge, EdgeKey, RawAccount, Result, TrustConnection,
};

use crate::extract::{extract, ExtractionStats, Registries};

/// Connections the deriver works on: explicit ones followed by ownership ones.
fn working_connections(registries: &Registries) -> Vec<TrustConnection> {
    let mut working = registries.connections().to_vec();
    for account in registries.accounts() {
        for holding in &account.holdings {
            let Some(token) = registries.token(&holding.token) else {
                continue;
            };
            working.push(TrustConnection::ownership(
                account.address,
                token.home,
                holding.balance,
            ));
        }
    }
    working
}

/// Hash indexes over the working connection set, holding positions in order.
struct ConnectionIndex {
    by_truster: HashMap<Address, Vec<usize>>,
    ownership: HashMap<(Address, Address), Vec<usize>>,
}

impl ConnectionIndex {
    fn build(working: &[TrustConnection]) -> Self {
        let mut by_truster: HashMap<Address, Vec<usize>> = HashMap::new();
        let mut ownership: HashMap<(Address, Address), Vec<usize>> = HashMap::new();

        for (i, connection) in working.iter().enumerate() {
            by_truster.entry(connection.truster).or_default().push(i);
            if connection.kind == ConnectionKind::Ownership {
                ownership.entry(connection.key()).or_default().push(i);
            }
        }

        Self {
            by_truster,
            ownership,
        }
    }

    /// Positions of the connections that can carry `sender`'s token homed at `home`.
    fn candidates(&self, sender: Address, home: Address) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .by_truster
            .get(&home)
            .into_iter()
            .flatten()
            .chain(self.ownership.get(&(sender, home)).into_iter().flatten())
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// Derive the deduplicated edge list from the registries.
///
/// # Errors
///
/// Returns `CoreError::EdgeCapacityOverflow`, naming the sender, receiver and
/// token, if a scaled capacity exceeds the storable range. The whole pass
/// fails; capacities are never saturated.
pub fn derive_edges(registries: &Registries) -> Result<Vec<DerivedEdge>> {
    let working = working_connections(registries);
    let index = ConnectionIndex::build(&working);

    debug!(
        explicit = registries.connections().len(),
        working = working.len(),
        "Resolving capacities"
    );

    let mut seen: HashSet<EdgeKey> = HashSet::new();
    let mut edges = Vec::new();

    for sender in registries.accounts() {
        for holding in &sender.holdings {
            if holding.balance.is_zero() {
                continue;
            }
            let Some(token) = registries.token(&holding.token) else {
                continue;
            };

            for position in index.candidates(sender.address, token.home) {
                let connection = &working[position];
                if connection.limit.is_zero() {
                    continue;
                }

                let raw = connection.limit.min(holding.balance);
                // Unscaled gate; the floored value is checked again below.
                if raw == U256::ZERO {
                    continue;
                }
                let capacity = scale_capacity(raw)
                    .map_err(|e| e.on_edge(sender.address, connection.trustee, token.home))?;

                let edge = DerivedEdge {
                    from: sender.address,
                    to: connection.trustee,
                    token: token.home,
                    capacity,
                };

                if edge.from == edge.to || edge.capacity == 0 {
                    continue;
                }
                if !seen.insert(edge.key()) {
                    continue;
                }
                debug!(
                    from = %edge.from,
                    to = %edge.to,
                    token = %edge.token,
                    capacity = edge.capacity,
                    via = connection.kind.as_str(),
                    "Emitting edge"
                );
                edges.push(edge);
            }
        }
    }

    Ok(edges)
}

/// Output of one derivation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    /// Registry sizes.
    pub stats: ExtractionStats,
    /// Derived edges in emission order.
    pub edges: Vec<DerivedEdge>,
}

/// Run extraction and edge derivation over a raw snapshot.
pub fn derive_from_raw(records: &[RawAccount]) -> Result<Derivation> {
    let registries = extract(records)?;
    let stats = registries.stats();

    info!(
        "Extracted {} accounts, {} connections, {} tokens",
        stats.accounts, stats.connections, stats.tokens
    );

    let edges = derive_edges(&registries)?;

    info!("Derived {} edges", edges.len());

    Ok(Derivation { stats, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustgraph_core::capacity::whole_units;
    use trustgraph_core::{CoreError, RawHolding, RawTrustLimit};

    const A: u8 = 0x0a;
    const B: u8 = 0x0b;
    const C: u8 = 0x0c;
    const D: u8 = 0x0d;
    const T: u8 = 0x71;
    const U: u8 = 0x72;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn s(byte: u8) -> String {
        addr(byte).to_checksum(None)
    }

    fn holding(token: u8, home: u8, balance: U256) -> RawHolding {
        RawHolding {
            token_address: s(token),
            token_home_address: s(home),
            balance: balance.to_string(),
        }
    }

    fn trust(truster: u8, trustee: u8, limit: U256) -> RawTrustLimit {
        RawTrustLimit {
            truster: s(truster),
            trustee: s(trustee),
            limit: limit.to_string(),
        }
    }

    fn account(address: u8, holdings: Vec<RawHolding>, outgoing: Vec<RawTrustLimit>) -> RawAccount {
        RawAccount {
            address: s(address),
            holdings,
            outgoing_trust: outgoing,
            incoming_trust: vec![],
        }
    }

    fn edge(from: u8, to: u8, token: u8, capacity: u64) -> DerivedEdge {
        DerivedEdge {
            from: addr(from),
            to: addr(to),
            token: addr(token),
            capacity,
        }
    }

    fn assert_invariants(edges: &[DerivedEdge]) {
        let mut keys = HashSet::new();
        for e in edges {
            assert_ne!(e.from, e.to, "self-loop {e:?}");
            assert!(e.capacity > 0, "zero capacity {e:?}");
            assert!(keys.insert(e.key()), "duplicate key {e:?}");
        }
    }

    #[test]
    fn test_return_to_home_and_two_hop_edge() {
        // A holds 5 T (home B); B trusts C for 100.
        let records = vec![
            account(A, vec![holding(T, B, whole_units(5))], vec![]),
            account(B, vec![], vec![trust(B, C, whole_units(100))]),
            account(C, vec![], vec![]),
        ];

        let derivation = derive_from_raw(&records).unwrap();
        assert_invariants(&derivation.edges);
        assert_eq!(derivation.edges, vec![edge(A, C, B, 5), edge(A, B, B, 5)]);
        assert_eq!(derivation.stats.connections, 1);
        assert_eq!(derivation.stats.tokens, 1);
    }

    #[test]
    fn test_capacity_is_min_of_limit_and_balance() {
        let records = vec![
            account(A, vec![holding(T, B, whole_units(50))], vec![]),
            account(
                B,
                vec![],
                vec![trust(B, C, whole_units(20)), trust(B, D, whole_units(80))],
            ),
        ];

        let edges = derive_from_raw(&records).unwrap().edges;
        assert_invariants(&edges);
        assert!(edges.contains(&edge(A, C, B, 20)));
        assert!(edges.contains(&edge(A, D, B, 50)));
        assert!(edges.contains(&edge(A, B, B, 50)));
    }

    #[test]
    fn test_own_token_home_produces_no_self_loop() {
        // B holds its own token and trusts C.
        let records = vec![account(
            B,
            vec![holding(T, B, whole_units(3))],
            vec![trust(B, C, whole_units(10))],
        )];

        let edges = derive_from_raw(&records).unwrap().edges;
        assert_invariants(&edges);
        assert_eq!(edges, vec![edge(B, C, B, 3)]);
    }

    #[test]
    fn test_zero_limit_never_produces_edge() {
        let records = vec![
            account(A, vec![holding(T, B, whole_units(5))], vec![]),
            account(B, vec![], vec![trust(B, C, U256::ZERO)]),
        ];

        let edges = derive_from_raw(&records).unwrap().edges;
        assert_eq!(edges, vec![edge(A, B, B, 5)]);
    }

    #[test]
    fn test_sub_unit_capacity_is_excluded() {
        let dust = whole_units(1) - U256::from(1);
        let records = vec![
            account(A, vec![holding(T, B, dust)], vec![]),
            account(B, vec![], vec![trust(B, C, whole_units(100))]),
        ];

        let edges = derive_from_raw(&records).unwrap().edges;
        assert!(edges.is_empty());

        // Limit below one unit also floors to zero.
        let records = vec![
            account(A, vec![holding(T, B, whole_units(5))], vec![]),
            account(B, vec![], vec![trust(B, C, dust)]),
        ];
        let edges = derive_from_raw(&records).unwrap().edges;
        assert_eq!(edges, vec![edge(A, B, B, 5)]);
    }

    #[test]
    fn test_zero_balance_holding_is_ignored() {
        let records = vec![
            account(A, vec![holding(T, B, U256::ZERO)], vec![]),
            account(B, vec![], vec![trust(B, C, whole_units(100))]),
        ];

        assert!(derive_from_raw(&records).unwrap().edges.is_empty());
    }

    #[test]
    fn test_duplicate_key_first_candidate_wins() {
        // The pair B->C is registered twice (once per reporting account) with
        // different limits; the first registered one decides the capacity.
        let records = vec![
            account(A, vec![holding(T, B, whole_units(50))], vec![]),
            account(B, vec![], vec![trust(B, C, whole_units(10))]),
            RawAccount {
                address: s(C),
                holdings: vec![],
                outgoing_trust: vec![],
                incoming_trust: vec![trust(B, C, whole_units(30))],
            },
        ];

        let edges = derive_from_raw(&records).unwrap().edges;
        assert_invariants(&edges);
        let to_c: Vec<_> = edges.iter().filter(|e| e.to == addr(C)).collect();
        assert_eq!(to_c.len(), 1);
        assert_eq!(to_c[0].capacity, 10);
    }

    #[test]
    fn test_home_account_holdings_extend_reach() {
        // B holds 4 U (home D); its ownership connection B->D has truster B, so
        // holders of B's token can reach D as well.
        let records = vec![
            account(A, vec![holding(T, B, whole_units(9))], vec![]),
            account(B, vec![holding(U, D, whole_units(4))], vec![]),
        ];

        let edges = derive_from_raw(&records).unwrap().edges;
        assert_invariants(&edges);
        assert_eq!(
            edges,
            vec![edge(A, B, B, 9), edge(A, D, B, 4), edge(B, D, D, 4)]
        );
    }

    #[test]
    fn test_capacity_bound_holds() {
        let records = vec![
            account(
                A,
                vec![holding(T, B, whole_units(7)), holding(U, C, whole_units(2))],
                vec![trust(A, B, whole_units(1))],
            ),
            account(
                B,
                vec![holding(T, B, whole_units(12))],
                vec![trust(B, D, whole_units(3))],
            ),
            account(
                C,
                vec![],
                vec![trust(C, A, whole_units(11)), trust(C, D, whole_units(1))],
            ),
        ];

        let registries = extract(&records).unwrap();
        let edges = derive_edges(&registries).unwrap();
        assert_invariants(&edges);

        for e in &edges {
            let sender = registries.account(&e.from).unwrap();
            let balance = sender
                .holdings
                .iter()
                .filter(|h| registries.token(&h.token).unwrap().home == e.token)
                .map(|h| h.balance)
                .max()
                .unwrap();
            // Explicit limits from the token home, plus the holder's own
            // ownership connection when the edge returns the token home.
            let limit = registries
                .connections()
                .iter()
                .filter(|c| c.truster == e.token && c.trustee == e.to)
                .map(|c| c.limit)
                .chain((e.to == e.token).then_some(balance))
                .max()
                .unwrap();
            assert!(whole_units(e.capacity) <= limit.min(balance), "{e:?}");
        }

        // B's limit toward D binds below A's balance of 7.
        assert!(edges.contains(&edge(A, D, B, 3)));
    }

    #[test]
    fn test_capacity_overflow_names_the_edge() {
        let records = vec![
            account(A, vec![holding(T, B, U256::MAX)], vec![]),
            account(B, vec![], vec![trust(B, C, U256::MAX)]),
        ];

        let err = derive_from_raw(&records).unwrap_err();
        match &err {
            CoreError::EdgeCapacityOverflow {
                from,
                to,
                token,
                ..
            } => {
                assert_eq!(*from, addr(A));
                assert_eq!(*token, addr(B));
                assert!(*to == addr(B) || *to == addr(C));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains(&s(A)));
        assert!(!err.is_malformed_input());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let records = vec![
            account(A, vec![holding(T, B, whole_units(5))], vec![]),
            account(
                B,
                vec![holding(T, B, whole_units(5))],
                vec![trust(B, C, whole_units(2))],
            ),
            account(
                C,
                vec![holding(U, C, whole_units(1))],
                vec![trust(C, A, whole_units(2))],
            ),
        ];

        let first = derive_from_raw(&records).unwrap();
        let second = derive_from_raw(&records).unwrap();
        assert_eq!(first, second);
    }
}
