//! Windowed-fetch scenarios: not-found handling, per-segment retry bounds,
//! and fixed-window pipelining.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use difs_core::Name;
use difs_engine::{EngineError, Fetcher};
use difs_tests::{fixtures::random_bytes, InsertBehavior};
use difs_wire::FaultAction;

use common::{build_segments, fetch_name, testbed, NODE_NAME};

#[tokio::test]
async fn test_get_not_found() {
    let bed = testbed(InsertBehavior::Pull).await;
    let name = Name::parse("/files/nothing").unwrap();

    let fetcher = Fetcher::new(
        Arc::clone(&bed.face),
        Arc::clone(&bed.signer),
        bed.config.clone(),
    );
    let mut sink = Vec::new();
    let err = fetcher.get(name, &mut sink).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound));

    // No segment request was ever issued.
    let node = Name::parse(NODE_NAME).unwrap();
    assert_eq!(bed.net.expressed_matching(&node), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_segment_retry_bound_aborts_fetch() {
    let bed = testbed(InsertBehavior::Pull).await;
    let name = Name::parse("/files/f").unwrap();
    let mut config = bed.config.clone();
    config.block_size = 64;

    let segments = build_segments(&name, &random_bytes(300, 5), &config, &bed.signer);
    assert!(segments.len() >= 8);
    bed.repo.seed(&name, segments);

    // Segment 5 times out forever.
    let victim = fetch_name(&name, 5);
    bed.net
        .inject_fault(victim.clone(), FaultAction::Timeout, usize::MAX);

    let fetcher = Fetcher::new(Arc::clone(&bed.face), Arc::clone(&bed.signer), config);
    let mut sink = Vec::new();
    let err = fetcher.get(name, &mut sink).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Transport { attempts: 4, .. }
    ));

    // Initial transmission plus exactly three retransmissions.
    assert_eq!(bed.net.expressed_matching(&victim), 4);
}

#[tokio::test]
async fn test_nack_consumes_the_same_retry_budget() {
    let bed = testbed(InsertBehavior::Pull).await;
    let name = Name::parse("/files/n").unwrap();
    let mut config = bed.config.clone();
    config.block_size = 64;

    let segments = build_segments(&name, &random_bytes(100, 6), &config, &bed.signer);
    bed.repo.seed(&name, segments);

    let victim = fetch_name(&name, 0);
    bed.net
        .inject_fault(victim.clone(), FaultAction::Nack, usize::MAX);

    let fetcher = Fetcher::new(Arc::clone(&bed.face), Arc::clone(&bed.signer), config);
    let mut sink = Vec::new();
    let err = fetcher.get(name, &mut sink).await.unwrap_err();
    assert!(matches!(err, EngineError::Transport { attempts: 4, .. }));
    assert_eq!(bed.net.expressed_matching(&victim), 4);
}

#[tokio::test]
async fn test_fixed_window_pipelining() {
    let bed = testbed(InsertBehavior::Pull).await;
    let name = Name::parse("/files/big").unwrap();
    let mut config = bed.config.clone();
    // 8-byte payloads: 2000 bytes -> 250 segments.
    config.block_size = 40;

    let segments = build_segments(&name, &random_bytes(2000, 9), &config, &bed.signer);
    assert_eq!(segments.len(), 250);
    bed.repo.seed(&name, segments);

    let fetcher = Fetcher::new(Arc::clone(&bed.face), Arc::clone(&bed.signer), config);
    let mut sink = Vec::new();
    let stats = fetcher.get(name.clone(), &mut sink).await.unwrap();
    assert_eq!(stats.segments, 250);
    assert_eq!(sink, random_bytes(2000, 9));

    // Reconstruct the order segment requests hit the wire.
    let node = Name::parse(NODE_NAME).unwrap();
    let order: Vec<u64> = bed
        .net
        .expressed()
        .into_iter()
        .filter(|n| node.is_prefix_of(n))
        .map(|n| n.segment_at(n.len() - 1).unwrap())
        .collect();
    assert_eq!(order.len(), 250);

    // Three batches: 100, 100, then 50 requests, each opened only after the
    // previous window's boundary segment was received.
    let batch1: BTreeSet<u64> = order[..100].iter().copied().collect();
    let batch2: BTreeSet<u64> = order[100..200].iter().copied().collect();
    let batch3: BTreeSet<u64> = order[200..].iter().copied().collect();
    assert_eq!(batch1, (0..100).collect::<BTreeSet<u64>>());
    assert_eq!(batch2, (100..200).collect::<BTreeSet<u64>>());
    assert_eq!(batch3, (200..250).collect::<BTreeSet<u64>>());
}

#[tokio::test]
async fn test_transient_segment_loss_recovers() {
    let bed = testbed(InsertBehavior::Pull).await;
    let name = Name::parse("/files/r").unwrap();
    let mut config = bed.config.clone();
    config.block_size = 64;

    let input = random_bytes(500, 11);
    let segments = build_segments(&name, &input, &config, &bed.signer);
    bed.repo.seed(&name, segments);

    // Two drops stay within the per-segment budget.
    bed.net
        .inject_fault(fetch_name(&name, 3), FaultAction::Timeout, 2);

    let fetcher = Fetcher::new(Arc::clone(&bed.face), Arc::clone(&bed.signer), config);
    let mut sink = Vec::new();
    fetcher.get(name, &mut sink).await.unwrap();
    assert_eq!(sink, input);
}
