//! Slices an input stream into hash-chained, signed segments.
//!
//! Chain digests are computed tail-first (segment `N-1` gets the all-zero
//! sentinel slot) but segments are constructed and stored in ascending index
//! order. All hashing happens up front; signing is deferred into the pre-sign
//! window so serving a request stays O(1) amortized. Nothing is evicted
//! during a put — the repository may re-request any segment.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use difs_core::{chain_content, Name, CHAIN_HASH_LEN, ZERO_HASH};
use difs_wire::Data;

#[cfg(test)]
use crate::config::ChainDigest;
use crate::config::{EngineConfig, SigningMode};
use crate::error::Result;
use crate::signer::Signer;

pub struct Segmenter {
    prefix: Name,
    /// Full segment contents (`hash_slot ‖ payload`), ascending.
    contents: Vec<Vec<u8>>,
    /// `hashes[i] = H(contents[i])`.
    hashes: Vec<[u8; CHAIN_HASH_LEN]>,
    total_bytes: u64,
    freshness: Duration,
    signing: SigningMode,
    pre_sign_window: usize,
    signer: Arc<Signer>,
    signed: BTreeMap<u64, Data>,
}

impl Segmenter {
    /// Reads `input` to its end and prepares the hash chain.
    pub fn from_reader(
        prefix: Name,
        mut input: impl Read,
        config: &EngineConfig,
        signer: Arc<Signer>,
    ) -> Result<Self> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;

        let payload_size = config.segment_payload_size();
        let count = segment_count(bytes.len(), payload_size);

        let mut contents = vec![Vec::new(); count];
        let mut hashes = vec![ZERO_HASH; count];
        let mut next_hash = ZERO_HASH;
        for index in (0..count).rev() {
            let start = index * payload_size;
            let end = bytes.len().min(start + payload_size);
            let content = chain_content(&next_hash, &bytes[start..end]);
            hashes[index] = config.chain_digest.digest(&content);
            next_hash = hashes[index];
            contents[index] = content;
        }

        debug!(
            prefix = %prefix,
            bytes = bytes.len(),
            segments = count,
            "prepared hash chain"
        );

        Ok(Self {
            prefix,
            contents,
            hashes,
            total_bytes: bytes.len() as u64,
            freshness: config.freshness_period,
            signing: config.signing,
            pre_sign_window: config.pre_sign_window,
            signer,
            signed: BTreeMap::new(),
        })
    }

    pub fn segment_count(&self) -> u64 {
        self.contents.len() as u64
    }

    pub fn final_index(&self) -> u64 {
        self.segment_count() - 1
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Chain digest of segment `index`'s full content.
    pub fn chain_hash(&self, index: u64) -> Option<&[u8; CHAIN_HASH_LEN]> {
        self.hashes.get(index as usize)
    }

    /// The signed segment at `index`, growing the pre-sign window as needed.
    /// `None` for indices past the end of the stream.
    pub fn segment(&mut self, index: u64) -> Option<Data> {
        if index >= self.segment_count() {
            return None;
        }
        self.ensure_signed(index);
        self.signed.get(&index).cloned()
    }

    /// Makes sure `[from, from + pre_sign_window]` are signed and cached.
    fn ensure_signed(&mut self, from: u64) {
        let upper = (from + self.pre_sign_window as u64).min(self.final_index());
        for index in from..=upper {
            if !self.signed.contains_key(&index) {
                let data = self.build_segment(index);
                self.signed.insert(index, data);
            }
        }
    }

    fn build_segment(&self, index: u64) -> Data {
        let last = self.final_index();
        let mut data = Data::new(
            self.prefix.clone().append_segment(index),
            self.contents[index as usize].clone(),
        )
        .with_freshness(self.freshness);
        if index == last {
            data = data.with_final_block(last);
        }

        if index == 0 {
            match self.signing {
                SigningMode::Identity => self.signer.sign_data_identity(&mut data),
                SigningMode::DigestSha256 => self.signer.sign_data_digest(&mut data),
            }
        } else {
            let next_hash = if index < last {
                &self.hashes[index as usize + 1]
            } else {
                &ZERO_HASH
            };
            self.signer.sign_data_chain(&mut data, next_hash);
        }
        data
    }

    /// Signs the whole stream at once. Used by callers that want every
    /// segment up front rather than window-driven growth.
    pub fn sign_all(&mut self) {
        for index in 0..=self.final_index() {
            if !self.signed.contains_key(&index) {
                let data = self.build_segment(index);
                self.signed.insert(index, data);
            }
        }
    }
}

/// `⌈bytes / payload_size⌉`, with an empty input yielding one empty segment
/// so the manifest range and final-block marker always exist.
pub fn segment_count(bytes: usize, payload_size: usize) -> usize {
    if bytes == 0 {
        1
    } else {
        bytes.div_ceil(payload_size)
    }
}
