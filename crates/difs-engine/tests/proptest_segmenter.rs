//! Property tests for segmentation exactness, chain continuity, and
//! finality uniqueness.

use proptest::prelude::*;
use std::sync::Arc;

use difs_core::{split_chain_content, Name, CHAIN_HASH_LEN, ZERO_HASH};
use difs_engine::{EngineConfig, Segmenter, Signer};

fn segment_all(bytes: &[u8], block_size: usize) -> (Segmenter, Vec<Vec<u8>>) {
    let config = EngineConfig {
        block_size,
        ..Default::default()
    };
    let mut segmenter = Segmenter::from_reader(
        Name::parse("/p/f").unwrap(),
        bytes,
        &config,
        Arc::new(Signer::generate("prop")),
    )
    .unwrap();
    let contents: Vec<Vec<u8>> = (0..segmenter.segment_count())
        .map(|i| segmenter.segment(i).unwrap().content)
        .collect();
    (segmenter, contents)
}

proptest! {
    // Payloads in index order concatenate back to the input, and the
    // segment count is exactly ceil(B / (S - 32)).
    #[test]
    fn prop_segmentation_exactness(
        bytes in proptest::collection::vec(any::<u8>(), 1..2048),
        block_size in (CHAIN_HASH_LEN + 1)..512,
    ) {
        let (segmenter, contents) = segment_all(&bytes, block_size);
        let payload_size = block_size - CHAIN_HASH_LEN;
        let expected = bytes.len().div_ceil(payload_size);
        prop_assert_eq!(segmenter.segment_count() as usize, expected);

        let mut reassembled = Vec::new();
        for content in &contents {
            let (_, payload) = split_chain_content(content).unwrap();
            reassembled.extend_from_slice(payload);
        }
        prop_assert_eq!(reassembled.len(), bytes.len());
        prop_assert_eq!(reassembled, bytes);
    }

    // Every hash slot matches the digest of the successor's full content;
    // the last slot is the zero sentinel.
    #[test]
    fn prop_chain_continuity(
        bytes in proptest::collection::vec(any::<u8>(), 1..2048),
        block_size in (CHAIN_HASH_LEN + 1)..256,
    ) {
        let (segmenter, contents) = segment_all(&bytes, block_size);
        let config = EngineConfig::default();
        for i in 0..contents.len() {
            let (slot, _) = split_chain_content(&contents[i]).unwrap();
            if i + 1 < contents.len() {
                prop_assert_eq!(slot, config.chain_digest.digest(&contents[i + 1]));
                prop_assert_eq!(slot, segmenter.chain_hash(i as u64 + 1).unwrap());
            } else {
                prop_assert_eq!(slot, &ZERO_HASH);
            }
        }
    }

    // Exactly one segment carries the final-block marker, valued N-1.
    #[test]
    fn prop_finality_uniqueness(
        bytes in proptest::collection::vec(any::<u8>(), 0..1024),
        block_size in (CHAIN_HASH_LEN + 1)..256,
    ) {
        let config = EngineConfig {
            block_size,
            ..Default::default()
        };
        let mut segmenter = Segmenter::from_reader(
            Name::parse("/p/f").unwrap(),
            bytes.as_slice(),
            &config,
            Arc::new(Signer::generate("prop")),
        )
        .unwrap();

        let count = segmenter.segment_count();
        let marked: Vec<(u64, u64)> = (0..count)
            .filter_map(|i| segmenter.segment(i).unwrap().final_block.map(|m| (i, m)))
            .collect();
        prop_assert_eq!(marked, vec![(count - 1, count - 1)]);
    }
}
