//! Get orchestrator: resolves a name to its manifest, pulls segments in
//! fixed pipelined windows, reorders them by index, and writes the
//! reassembled bytes to the output sink.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use difs_core::{split_chain_content, Manifest, Name, RepoRange};
use difs_wire::{is_retryable, Data, Face, Interest};

use crate::commands::CommandClient;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::signer::Signer;

/// Counters reported after a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchStats {
    pub segments: u64,
    pub total_bytes: u64,
}

pub struct Fetcher {
    face: Arc<dyn Face>,
    signer: Arc<Signer>,
    config: EngineConfig,
}

impl Fetcher {
    pub fn new(face: Arc<dyn Face>, signer: Arc<Signer>, config: EngineConfig) -> Self {
        Self {
            face,
            signer,
            config,
        }
    }

    /// Fetches `name` from the repository into `sink`.
    pub async fn get(&self, name: Name, sink: &mut dyn Write) -> Result<FetchStats> {
        self.config.validate()?;
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_get(name, sink))
                .await
                .map_err(|_| EngineError::DeadlineExceeded {
                    elapsed_ms: limit.as_millis() as u64,
                })?,
            None => self.run_get(name, sink).await,
        }
    }

    async fn run_get(&self, name: Name, sink: &mut dyn Write) -> Result<FetchStats> {
        let commands = CommandClient::new(
            Arc::clone(&self.face),
            Arc::clone(&self.signer),
            self.config.clone(),
        );
        let Some(manifest) = commands.get_manifest(&name).await? else {
            warn!(name = %name, "not found");
            return Err(EngineError::NotFound);
        };
        debug!(name = %name, shards = manifest.repos.len(), "manifest resolved");

        if manifest.repos.is_empty() {
            return Err(EngineError::Protocol {
                code: 500,
                text: Some("manifest carries no repository shards".to_string()),
            });
        }

        let file_name = Name::parse(&manifest.name)?;
        let window = self.config.fetch_window;

        let mut buffer: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
        let mut final_index: Option<u64> = None;
        let mut inflight: JoinSet<Result<(u64, Data)>> = JoinSet::new();

        for shard in &manifest.repos {
            self.issue_window(&mut inflight, shard, &file_name, shard.start)?;
        }

        while let Some(joined) = inflight.join_next().await {
            let (index, data) = joined.map_err(|e| EngineError::Io(std::io::Error::other(e)))??;

            if let Some(last) = data.final_block {
                final_index = Some(last);
            }
            let (_slot, payload) =
                split_chain_content(&data.content).map_err(|_| EngineError::Integrity {
                    segment: index,
                    reason: format!("content shorter than the chain hash slot: {}", data.content.len()),
                })?;
            buffer.insert(index, payload.to_vec());

            // Crossing a window boundary opens the next window of the
            // owning shard.
            if (index + 1) % window == 0 {
                if let Some(shard) = shard_containing(&manifest, index) {
                    if index < shard.end {
                        self.issue_window(&mut inflight, shard, &file_name, index + 1)?;
                    }
                }
            }

            if let Some(last) = final_index {
                if buffer.len() as u64 == last + 1 {
                    break;
                }
            }
        }
        inflight.abort_all();

        let Some(last) = final_index else {
            return Err(EngineError::Integrity {
                segment: 0,
                reason: "no final-block marker observed".to_string(),
            });
        };
        if let Some(missing) = (0..=last).find(|index| !buffer.contains_key(index)) {
            return Err(EngineError::Integrity {
                segment: missing,
                reason: "segment missing after all shards drained".to_string(),
            });
        }

        let mut stats = FetchStats::default();
        for payload in buffer.values() {
            sink.write_all(payload)?;
            stats.total_bytes += payload.len() as u64;
            stats.segments += 1;
        }
        sink.flush()?;

        info!(
            name = %name,
            segments = stats.segments,
            total_bytes = stats.total_bytes,
            "end of file reached"
        );
        Ok(stats)
    }

    /// Issues one pipelined batch of segment requests starting at `start`.
    fn issue_window(
        &self,
        inflight: &mut JoinSet<Result<(u64, Data)>>,
        shard: &RepoRange,
        file_name: &Name,
        start: u64,
    ) -> Result<()> {
        let end = shard.end.min(start + self.config.fetch_window - 1);
        let shard_base = Name::parse(&shard.name)?
            .append_str("data")
            .join(file_name);
        debug!(shard = %shard.name, start, end, "issuing fetch window");

        for index in start..=end {
            let face = Arc::clone(&self.face);
            let name = shard_base.clone().append_segment(index);
            let lifetime = self.config.interest_lifetime;
            let max_retry = self.config.max_retry;
            inflight.spawn(async move {
                fetch_segment(face, name, lifetime, max_retry, index).await
            });
        }
        Ok(())
    }
}

fn shard_containing<'a>(manifest: &'a Manifest, index: u64) -> Option<&'a RepoRange> {
    manifest
        .repos
        .iter()
        .find(|shard| shard.start <= index && index <= shard.end)
}

/// Pulls one segment, retrying nack/timeout with a budget owned by this
/// request alone. Exhausting the budget aborts the whole fetch: reassembly
/// can never complete with a hole in the index space.
async fn fetch_segment(
    face: Arc<dyn Face>,
    name: Name,
    lifetime: std::time::Duration,
    max_retry: u32,
    index: u64,
) -> Result<(u64, Data)> {
    let mut attempts = 0u32;
    loop {
        let interest = Interest::new(name.clone())
            .with_lifetime(lifetime)
            .with_must_be_fresh(true);
        match face.express(interest).await {
            Ok(data) => return Ok((index, data)),
            Err(e) if is_retryable(&e) && attempts < max_retry => {
                attempts += 1;
                warn!(name = %name, attempt = attempts, error = %e, "retransmitting segment request");
            }
            Err(e) => {
                warn!(name = %name, error = %e, "aborting fetch after retries");
                return Err(EngineError::Transport {
                    attempts: attempts + 1,
                    source: e,
                });
            }
        }
    }
}
