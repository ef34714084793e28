//! Signing for published data and outgoing commands.
//!
//! Three data signature forms: identity (ed25519), content digest (SHA-256),
//! and hash-chain link, whose signature value is the successor segment's
//! chain digest verbatim. Command requests get a timestamp, a nonce, and a
//! signature component appended to their name. The signer is stateless and
//! safe to call from the data-serving path; verification of fetched data is
//! the downstream validator's concern (only test helpers verify here).

use ed25519_dalek::{Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

use difs_core::{Name, CHAIN_HASH_LEN};
use difs_wire::{Data, SignatureInfo, SignatureKind};

use sha2::{Digest, Sha256};

/// A named ed25519 signing identity. The key-chain and certificate store are
/// external; identities are generated or injected, never persisted here.
pub struct Identity {
    name: String,
    key: SigningKey,
}

impl Identity {
    /// Generates a fresh identity.
    pub fn generate(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic identity from a 32-byte seed.
    pub fn from_seed(name: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            name: name.into(),
            key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").field("name", &self.name).finish()
    }
}

/// Produces signatures over outgoing data and commands.
pub struct Signer {
    identity: Identity,
}

impl Signer {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    /// Convenience constructor with a freshly generated identity.
    pub fn generate(name: impl Into<String>) -> Self {
        Self::new(Identity::generate(name))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Signs `data` with the identity key.
    pub fn sign_data_identity(&self, data: &mut Data) {
        let portion = data_signed_portion(data);
        let signature = self.identity.key.sign(&portion);
        data.signature = Some(SignatureInfo {
            kind: SignatureKind::Identity,
            key_locator: Some(self.identity.name.clone()),
            value: signature.to_bytes().to_vec(),
        });
    }

    /// Signs `data` with a bare SHA-256 content digest.
    pub fn sign_data_digest(&self, data: &mut Data) {
        let portion = data_signed_portion(data);
        data.signature = Some(SignatureInfo {
            kind: SignatureKind::DigestSha256,
            key_locator: None,
            value: Sha256::digest(&portion).to_vec(),
        });
    }

    /// Signs `data` as a hash-chain link carrying `next_hash`.
    pub fn sign_data_chain(&self, data: &mut Data, next_hash: &[u8; CHAIN_HASH_LEN]) {
        data.signature = Some(SignatureInfo {
            kind: SignatureKind::HashChainLink,
            key_locator: None,
            value: next_hash.to_vec(),
        });
    }

    /// Turns `name` into a signed command name by appending a timestamp, a
    /// nonce, and an identity signature over the preceding components.
    pub fn sign_command(&self, name: Name) -> Name {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut nonce = [0u8; 8];
        OsRng.fill_bytes(&mut nonce);

        let unsigned = name
            .append_bytes(timestamp.to_be_bytes().to_vec())
            .append_bytes(nonce.to_vec());
        let signature = self.identity.key.sign(unsigned.to_uri().as_bytes());
        unsigned.append_bytes(signature.to_bytes().to_vec())
    }
}

/// Bytes covered by a data signature: name, content, finality, freshness.
fn data_signed_portion(data: &Data) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.content.len() + 64);
    buf.extend_from_slice(data.name.to_uri().as_bytes());
    buf.extend_from_slice(&data.content);
    match data.final_block {
        Some(index) => {
            buf.push(1);
            buf.extend_from_slice(&index.to_be_bytes());
        }
        None => buf.push(0),
    }
    buf.extend_from_slice(&(data.freshness.as_millis() as u64).to_be_bytes());
    buf
}

/// Verifies an identity signature. Test helper; live validation of fetched
/// data happens in the external validator.
pub fn verify_data_identity(data: &Data, key: &VerifyingKey) -> bool {
    let Some(signature) = &data.signature else {
        return false;
    };
    if signature.kind != SignatureKind::Identity {
        return false;
    }
    let Ok(bytes) = <[u8; 64]>::try_from(signature.value.as_slice()) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&bytes);
    key.verify(&data_signed_portion(data), &signature).is_ok()
}
