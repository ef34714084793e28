//! Shared setup for the engine integration suites.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use difs_core::Name;
use difs_engine::{EngineConfig, Segmenter, Signer};
use difs_tests::{InsertBehavior, RepoNode};
use difs_wire::{Data, Face, MemNetwork};

pub const REPO_PREFIX: &str = "/repo";
pub const NODE_NAME: &str = "/node0";

pub struct TestBed {
    pub net: Arc<MemNetwork>,
    pub repo: Arc<RepoNode>,
    pub face: Arc<dyn Face>,
    pub signer: Arc<Signer>,
    pub config: EngineConfig,
}

/// One client face, one repository node, fast timers.
pub async fn testbed(behavior: InsertBehavior) -> TestBed {
    let net = MemNetwork::new();
    let repo_prefix = Name::parse(REPO_PREFIX).unwrap();
    let node_name = Name::parse(NODE_NAME).unwrap();
    let repo = RepoNode::start(&net, repo_prefix.clone(), node_name, behavior).await;

    let config = EngineConfig {
        repo_prefix,
        check_period: Duration::from_millis(20),
        interest_lifetime: Duration::from_millis(500),
        ..Default::default()
    };
    let face: Arc<dyn Face> = Arc::new(net.face());
    TestBed {
        net,
        repo,
        face,
        signer: Arc::new(Signer::generate("test-identity")),
        config,
    }
}

/// Builds the signed segments of `bytes` the way a put would publish them.
pub fn build_segments(
    name: &Name,
    bytes: &[u8],
    config: &EngineConfig,
    signer: &Arc<Signer>,
) -> Vec<Data> {
    let mut segmenter =
        Segmenter::from_reader(name.clone(), bytes, config, Arc::clone(signer)).unwrap();
    (0..segmenter.segment_count())
        .map(|i| segmenter.segment(i).unwrap())
        .collect()
}

/// Name a fetch-namespace segment request carries.
pub fn fetch_name(file_name: &Name, index: u64) -> Name {
    Name::parse(NODE_NAME)
        .unwrap()
        .append_str("data")
        .join(file_name)
        .append_segment(index)
}
