//! End-to-end: snapshot file -> derivation -> edge store -> transfer graph.

use std::io::{Seek, Write};
use std::time::Duration;

use serde_json::json;
use tempfile::NamedTempFile;
use trustgraph_core::{Address, EdgeKey};
use trustgraph_engine::{
    plan_transfer, PathSolver, PlanError, TransferGraph, TransferPlan, TransferRequest,
};
use trustgraph_indexer::source::FileSource;
use trustgraph_indexer::storage::Storage;
use trustgraph_indexer::updater::{GraphUpdater, GRAPH_UPDATE_METRICS};

const ONE: &str = "1000000000000000000";

fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

fn hex(byte: u8) -> String {
    // Lowercase on purpose; extraction normalizes.
    format!("0x{}", format!("{byte:02x}").repeat(20))
}

fn units(n: u64) -> String {
    format!("{n}{}", &ONE[1..])
}

/// Alice holds 10 of Bob's token, Bob trusts Carol for `bob_limit` and Dave
/// for 4 when `with_dave` is set.
fn write_snapshot(file: &mut NamedTempFile, bob_limit: u64, with_dave: bool) {
    let mut bob_trust = vec![json!({
        "truster": hex(0x0b),
        "trustee": hex(0x0c),
        "limit": units(bob_limit),
    })];
    if with_dave {
        bob_trust.push(json!({
            "truster": hex(0x0b),
            "trustee": hex(0x0d),
            "limit": units(4),
        }));
    }

    let snapshot = json!({
        "accounts": [
            {
                "address": hex(0x0a),
                "holdings": [{
                    "tokenAddress": hex(0x71),
                    "tokenHomeAddress": hex(0x0b),
                    "balance": units(10),
                }],
                "outgoingTrust": [],
                "incomingTrust": [],
            },
            {
                "address": hex(0x0b),
                "holdings": [],
                "outgoingTrust": bob_trust,
                "incomingTrust": [],
            },
        ]
    });

    let file = file.as_file_mut();
    file.set_len(0).unwrap();
    file.rewind().unwrap();
    file.write_all(snapshot.to_string().as_bytes()).unwrap();
    file.flush().unwrap();
}

fn capacity_of(graph: &TransferGraph, from: u8, to: u8, token: u8) -> Option<u64> {
    let key = EdgeKey {
        from: addr(from),
        to: addr(to),
        token: addr(token),
    };
    graph
        .edges()
        .iter()
        .find(|e| e.key() == key)
        .map(|e| e.capacity)
}

#[derive(Debug, thiserror::Error)]
#[error("no direct edge")]
struct NoDirectEdge;

/// Single-hop solver standing in for the external max-flow implementation.
struct SingleHop;

impl PathSolver for SingleHop {
    type Error = NoDirectEdge;

    fn solve(
        &self,
        graph: &TransferGraph,
        request: &TransferRequest,
    ) -> Result<TransferPlan, NoDirectEdge> {
        let max_flow = graph
            .edges()
            .iter()
            .filter(|e| e.from == request.from && e.to == request.to)
            .map(|e| e.capacity)
            .sum::<u64>()
            .min(request.amount);
        if max_flow == 0 {
            return Err(NoDirectEdge);
        }
        Ok(TransferPlan {
            max_flow,
            steps: vec![],
        })
    }
}

#[tokio::test]
async fn test_snapshot_to_transfer_graph() {
    let temp_db = NamedTempFile::new().unwrap();
    let storage = Storage::new_with_path(temp_db.path(), None, None)
        .await
        .unwrap();
    storage.run_migrations().await.unwrap();

    // Empty store: the solver must see EmptyGraph, not "no path".
    let graph = storage.load_transfer_graph().await.unwrap();
    let request = TransferRequest {
        from: addr(0x0a),
        to: addr(0x0c),
        amount: 3,
    };
    assert!(matches!(
        plan_transfer(&SingleHop, &graph, &request),
        Err(PlanError::EmptyGraph)
    ));

    let mut snapshot = NamedTempFile::new().unwrap();
    write_snapshot(&mut snapshot, 6, true);

    let updater = GraphUpdater::new(
        FileSource::new(snapshot.path()),
        storage.clone(),
        Duration::from_secs(60),
    );

    let first = updater.run_once().await.unwrap();
    assert_eq!(first.sync.added, 3);

    let graph = storage.load_transfer_graph().await.unwrap();
    assert_eq!(capacity_of(&graph, 0x0a, 0x0c, 0x0b), Some(6));
    assert_eq!(capacity_of(&graph, 0x0a, 0x0d, 0x0b), Some(4));
    assert_eq!(capacity_of(&graph, 0x0a, 0x0b, 0x0b), Some(10));
    assert_eq!(graph.nodes().len(), 4);

    let plan = plan_transfer(&SingleHop, &graph, &request).unwrap();
    assert_eq!(plan.max_flow, 3);

    let stored_before = storage.list_edges().await.unwrap();

    // Bob raises Carol's limit and drops Dave.
    write_snapshot(&mut snapshot, 8, false);
    let second = updater.run_once().await.unwrap();
    assert_eq!(second.sync.added, 0);
    assert_eq!(second.sync.updated, 1);
    assert_eq!(second.sync.removed, 1);
    assert_eq!(second.sync.unchanged, 1);

    let stored_after = storage.list_edges().await.unwrap();
    assert_eq!(stored_after.len(), 2);
    for edge in &stored_after {
        let before = stored_before
            .iter()
            .find(|e| e.key() == edge.key())
            .unwrap();
        // Updated and untouched edges keep their identity.
        assert_eq!(before.id, edge.id);
    }

    let graph = storage.load_transfer_graph().await.unwrap();
    assert_eq!(capacity_of(&graph, 0x0a, 0x0c, 0x0b), Some(8));
    assert_eq!(capacity_of(&graph, 0x0a, 0x0d, 0x0b), None);
    assert!(!graph.contains_node(&addr(0x0d)));

    // Same snapshot again: nothing to write.
    let third = updater.run_once().await.unwrap();
    assert_eq!(
        third.sync.added + third.sync.updated + third.sync.removed,
        0
    );

    let metrics = storage
        .get_metrics(GRAPH_UPDATE_METRICS)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(metrics.payload["sync"]["unchanged"], 2);

    storage.close().await;
}

#[tokio::test]
async fn test_malformed_snapshot_leaves_store_untouched() {
    let temp_db = NamedTempFile::new().unwrap();
    let storage = Storage::new_with_path(temp_db.path(), None, None)
        .await
        .unwrap();
    storage.run_migrations().await.unwrap();

    let mut snapshot = NamedTempFile::new().unwrap();
    write_snapshot(&mut snapshot, 6, true);
    let updater = GraphUpdater::new(
        FileSource::new(snapshot.path()),
        storage.clone(),
        Duration::from_secs(60),
    );
    updater.run_once().await.unwrap();
    let before = storage.list_edges().await.unwrap();

    // A truncated address aborts the whole pass.
    let broken = json!([{
        "address": "0x0a0a",
        "holdings": [],
        "outgoingTrust": [],
        "incomingTrust": [],
    }]);
    std::fs::write(snapshot.path(), broken.to_string()).unwrap();

    assert!(updater.run_once().await.is_err());
    assert_eq!(storage.list_edges().await.unwrap(), before);

    storage.close().await;
}
