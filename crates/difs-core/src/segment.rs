//! Layout of hash-chained segment content.
//!
//! Every segment of a stored file carries `hash_slot(32) ‖ payload`, where the
//! slot holds the digest of the *next* segment's full content. The last
//! segment's slot is the all-zero sentinel, terminating the chain.

use crate::error::{CoreError, Result};

/// Size of the chain digest prepended to every segment payload.
pub const CHAIN_HASH_LEN: usize = 32;

/// The slot value carried by the final segment of a chain.
pub const ZERO_HASH: [u8; CHAIN_HASH_LEN] = [0u8; CHAIN_HASH_LEN];

/// Builds segment content from a chain hash slot and a payload slice.
pub fn chain_content(next_hash: &[u8; CHAIN_HASH_LEN], payload: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(CHAIN_HASH_LEN + payload.len());
    content.extend_from_slice(next_hash);
    content.extend_from_slice(payload);
    content
}

/// Splits segment content into its hash slot and payload.
pub fn split_chain_content(content: &[u8]) -> Result<(&[u8], &[u8])> {
    if content.len() < CHAIN_HASH_LEN {
        return Err(CoreError::ShortContent {
            len: content.len(),
        });
    }
    Ok(content.split_at(CHAIN_HASH_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_content_layout() {
        let hash = [7u8; CHAIN_HASH_LEN];
        let content = chain_content(&hash, b"payload");
        assert_eq!(content.len(), CHAIN_HASH_LEN + 7);

        let (slot, payload) = split_chain_content(&content).unwrap();
        assert_eq!(slot, &hash);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_empty_payload() {
        let content = chain_content(&ZERO_HASH, b"");
        assert_eq!(content.len(), CHAIN_HASH_LEN);
        let (slot, payload) = split_chain_content(&content).unwrap();
        assert_eq!(slot, &ZERO_HASH);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_short_content_rejected() {
        assert!(split_chain_content(&[0u8; 31]).is_err());
    }
}
