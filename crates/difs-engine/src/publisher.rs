//! Put orchestrator: registers the data prefix, serves the manifest and
//! segments on demand, and drives the insert → check handshake until the
//! repository has accepted every segment.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use difs_core::{Component, Manifest, Name};
use difs_wire::{Data, Face, Interest, ProducerHandler};

use crate::commands::CommandClient;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::segmenter::Segmenter;
use crate::signer::Signer;

/// Freshness of the manifest response; short, since the manifest answers one
/// bootstrap request per insert.
const MANIFEST_FRESHNESS: Duration = Duration::from_secs(3);

/// Phases of a running put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PutState {
    Init,
    Registered,
    InsertSent,
    Checking,
    Done,
}

/// Result of a completed put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub segments: u64,
    pub total_bytes: u64,
    pub process_id: u64,
}

pub struct Publisher {
    face: Arc<dyn Face>,
    signer: Arc<Signer>,
    config: EngineConfig,
}

impl Publisher {
    pub fn new(face: Arc<dyn Face>, signer: Arc<Signer>, config: EngineConfig) -> Self {
        Self {
            face,
            signer,
            config,
        }
    }

    /// Ingests `input` under `name` and blocks until the repository reports
    /// all segments accepted. The optional configured timeout bounds the
    /// whole operation irrespective of state.
    pub async fn put(&self, name: Name, input: impl Read) -> Result<PutOutcome> {
        self.config.validate()?;
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_put(name, input))
                .await
                .map_err(|_| EngineError::DeadlineExceeded {
                    elapsed_ms: limit.as_millis() as u64,
                })?,
            None => self.run_put(name, input).await,
        }
    }

    async fn run_put(&self, name: Name, input: impl Read) -> Result<PutOutcome> {
        let mut state = PutState::Init;
        debug!(name = %name, ?state, "starting put");

        let segmenter =
            Segmenter::from_reader(name.clone(), input, &self.config, Arc::clone(&self.signer))?;
        let segments = segmenter.segment_count();
        let total_bytes = segmenter.total_bytes();

        let manifest = Manifest::single(name.to_uri(), 0, segments - 1);
        let producer = Arc::new(PutProducer {
            prefix: name.clone(),
            manifest_json: manifest.to_json()?,
            segmenter: Mutex::new(segmenter),
            signer: Arc::clone(&self.signer),
        });

        self.face
            .register(name.clone(), producer)
            .await
            .map_err(|e| EngineError::Registration {
                prefix: name.to_uri(),
                reason: e.to_string(),
            })?;
        state = PutState::Registered;
        debug!(name = %name, ?state, "data prefix registered");

        let commands = CommandClient::new(
            Arc::clone(&self.face),
            Arc::clone(&self.signer),
            self.config.clone(),
        );
        let response = commands.insert(&name).await?;
        let process_id = response.process_id;
        state = PutState::InsertSent;
        debug!(name = %name, ?state, process_id, "insert command accepted");

        state = PutState::Checking;
        loop {
            tokio::time::sleep(self.config.check_period).await;
            let response = commands.insert_check(&name, process_id).await?;
            let inserted = response.insert_num.unwrap_or(0);
            debug!(name = %name, ?state, inserted, segments, "insert check");
            if inserted >= segments {
                break;
            }
        }

        state = PutState::Done;
        info!(
            name = %name,
            ?state,
            segments,
            total_bytes,
            "put complete"
        );
        Ok(PutOutcome {
            segments,
            total_bytes,
            process_id,
        })
    }
}

/// Serves the manifest and cached segments while the put is in flight.
struct PutProducer {
    prefix: Name,
    manifest_json: String,
    segmenter: Mutex<Segmenter>,
    signer: Arc<Signer>,
}

#[async_trait]
impl ProducerHandler for PutProducer {
    async fn on_interest(&self, _prefix: &Name, interest: &Interest) -> Option<Data> {
        // Exact prefix match: the bootstrap manifest request.
        if interest.name == self.prefix {
            let mut data = Data::new(self.prefix.clone(), self.manifest_json.clone().into_bytes())
                .with_freshness(MANIFEST_FRESHNESS);
            self.signer.sign_data_identity(&mut data);
            return Some(data);
        }

        // One extra component addressing a single segment.
        if interest.name.len() == self.prefix.len() + 1 {
            if let Some(Component::Segment(index)) = interest.name.get(self.prefix.len()) {
                return self.segmenter.lock().segment(*index);
            }
        }

        warn!(name = %interest.name, "unexpected interest on data prefix");
        None
    }
}
