//! Engine configuration and tunables.

use std::time::Duration;

use blake2::Blake2s256;
use sha2::{Digest, Sha256};

use difs_core::{Name, CHAIN_HASH_LEN};

use crate::error::{EngineError, Result};

/// Default segment block size in bytes, chain hash slot included.
pub const DEFAULT_BLOCK_SIZE: usize = 1000;

/// Default request lifetime.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

/// Default freshness period for published segments.
pub const DEFAULT_FRESHNESS_PERIOD: Duration = Duration::from_millis(10_000);

/// Default period between insert-check polls.
pub const DEFAULT_CHECK_PERIOD: Duration = Duration::from_millis(1000);

/// Segments kept signed and ready ahead of the last requested index.
pub const DEFAULT_PRE_SIGN_WINDOW: usize = 11;

/// Pipelined segment requests per fetch batch.
pub const DEFAULT_FETCH_WINDOW: u64 = 100;

/// Retransmissions allowed per logical request/response pair.
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// How segment 0 is signed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningMode {
    /// Sign with the configured identity key.
    #[default]
    Identity,
    /// Content digest only.
    DigestSha256,
}

/// Digest algorithm for the backward hash chain. Both produce 32 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainDigest {
    #[default]
    Sha256,
    Blake2s,
}

impl ChainDigest {
    /// Digests `bytes` into a chain hash.
    pub fn digest(&self, bytes: &[u8]) -> [u8; CHAIN_HASH_LEN] {
        match self {
            ChainDigest::Sha256 => Sha256::digest(bytes).into(),
            ChainDigest::Blake2s => Blake2s256::digest(bytes).into(),
        }
    }
}

/// Tunables for the put/get engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name prefix the repository listens on for commands.
    pub repo_prefix: Name,
    /// Segment block size in bytes; must exceed the 32-byte chain hash slot.
    pub block_size: usize,
    pub interest_lifetime: Duration,
    pub freshness_period: Duration,
    pub check_period: Duration,
    pub pre_sign_window: usize,
    pub fetch_window: u64,
    pub max_retry: u32,
    /// Optional overall deadline for a whole put or get.
    pub timeout: Option<Duration>,
    /// Routing annotation attached to outgoing commands, forwarded verbatim.
    pub forwarding_hint: Option<Name>,
    /// Target node for insert commands, when the caller pins one.
    pub node_prefix: Option<Name>,
    pub signing: SigningMode,
    pub chain_digest: ChainDigest,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repo_prefix: Name::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            interest_lifetime: DEFAULT_INTEREST_LIFETIME,
            freshness_period: DEFAULT_FRESHNESS_PERIOD,
            check_period: DEFAULT_CHECK_PERIOD,
            pre_sign_window: DEFAULT_PRE_SIGN_WINDOW,
            fetch_window: DEFAULT_FETCH_WINDOW,
            max_retry: DEFAULT_MAX_RETRY,
            timeout: None,
            forwarding_hint: None,
            node_prefix: None,
            signing: SigningMode::default(),
            chain_digest: ChainDigest::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_repo_prefix(mut self, repo_prefix: Name) -> Self {
        self.repo_prefix = repo_prefix;
        self
    }

    /// Rejects configurations the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.block_size <= CHAIN_HASH_LEN {
            return Err(EngineError::Config(format!(
                "block size {} must exceed the chain hash size {}",
                self.block_size, CHAIN_HASH_LEN
            )));
        }
        if self.fetch_window == 0 {
            return Err(EngineError::Config("fetch window must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Payload bytes carried per segment.
    pub fn segment_payload_size(&self) -> usize {
        self.block_size - CHAIN_HASH_LEN
    }
}
