//! Request and response packets exchanged over the wire substrate.
//!
//! The TLV framing of these packets on a real forwarder link is the wire
//! codec's concern and out of scope here; this module models the fields the
//! engine reads and writes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use difs_core::Name;

/// Default request lifetime when the caller sets none.
pub const DEFAULT_LIFETIME: Duration = Duration::from_millis(4000);

/// Default response freshness when the producer sets none.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_millis(10_000);

/// How a [`Data`] packet was signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureKind {
    /// Signed with an identity key.
    Identity,
    /// Content digest only, no key involved.
    DigestSha256,
    /// Hash-chain link: the signature value is the successor's chain digest.
    HashChainLink,
}

/// Signature carried by a [`Data`] packet. Verification is the downstream
/// validator's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub kind: SignatureKind,
    /// Name of the signing identity, when one was used.
    pub key_locator: Option<String>,
    /// Opaque signature bytes.
    pub value: Vec<u8>,
}

/// A pull request for a named payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub lifetime: Duration,
    pub must_be_fresh: bool,
    pub can_be_prefix: bool,
    pub forwarding_hint: Option<Name>,
    pub nonce: u64,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            lifetime: DEFAULT_LIFETIME,
            must_be_fresh: false,
            can_be_prefix: false,
            forwarding_hint: None,
            nonce: rand::random(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    pub fn with_forwarding_hint(mut self, hint: Name) -> Self {
        self.forwarding_hint = Some(hint);
        self
    }
}

/// A named payload satisfying exactly one [`Interest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub name: Name,
    pub content: Vec<u8>,
    /// Index of the last segment; present iff this is the last segment.
    pub final_block: Option<u64>,
    pub freshness: Duration,
    pub signature: Option<SignatureInfo>,
}

impl Data {
    pub fn new(name: Name, content: Vec<u8>) -> Self {
        Self {
            name,
            content,
            final_block: None,
            freshness: DEFAULT_FRESHNESS,
            signature: None,
        }
    }

    pub fn with_final_block(mut self, index: u64) -> Self {
        self.final_block = Some(index);
        self
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }
}
