//! In-process repository node.
//!
//! [`RepoNode`] answers the command verbs a real DIFS repository exposes and
//! pulls published segments over the same in-memory substrate the engine
//! under test uses. It backs the integration suites and the CLI loopback
//! mode; it is not a storage server.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use difs_core::{
    CommandParameter, CommandResponse, Component, Manifest, Name, RepoRange, Verb,
};
use difs_wire::{Data, Face, Interest, MemNetwork, ProducerHandler};

/// How the node reacts to insert commands.
#[derive(Debug, Clone)]
pub enum InsertBehavior {
    /// Pull every published segment as soon as the insert lands.
    Pull,
    /// Refuse inserts with this status code.
    Reject(u16),
    /// Accept, but report scripted progress values on successive checks
    /// (the last value is sticky). No segments are pulled.
    Scripted(Vec<u64>),
}

/// Observed request counts, for assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoCounters {
    pub inserts: u64,
    pub checks: u64,
    pub gets: u64,
    pub deletes: u64,
    pub del_nodes: u64,
    pub data_serves: u64,
}

struct StoredFile {
    segments: BTreeMap<u64, Data>,
    final_index: u64,
}

struct ProcessStatus {
    accepted: u64,
    script: Option<(Vec<u64>, usize)>,
}

#[derive(Default)]
struct RepoState {
    files: HashMap<String, StoredFile>,
    processes: HashMap<u64, ProcessStatus>,
    next_process_id: u64,
}

pub struct RepoNode {
    repo_prefix: Name,
    node_name: Name,
    net: Arc<MemNetwork>,
    behavior: InsertBehavior,
    state: Mutex<RepoState>,
    counters: Mutex<RepoCounters>,
    // Handle back to the owning Arc, for spawning pull tasks from handlers.
    weak_self: Mutex<std::sync::Weak<RepoNode>>,
}

impl RepoNode {
    /// Registers a node on `net` answering commands under `repo_prefix` and
    /// serving stored segments under `node_name`.
    pub async fn start(
        net: &Arc<MemNetwork>,
        repo_prefix: Name,
        node_name: Name,
        behavior: InsertBehavior,
    ) -> Arc<Self> {
        let node = Arc::new(Self {
            repo_prefix: repo_prefix.clone(),
            node_name: node_name.clone(),
            net: Arc::clone(net),
            behavior,
            state: Mutex::new(RepoState::default()),
            counters: Mutex::new(RepoCounters::default()),
            weak_self: Mutex::new(std::sync::Weak::new()),
        });
        *node.weak_self.lock() = Arc::downgrade(&node);

        let face = net.face();
        face.register(repo_prefix, Arc::new(CommandEndpoint(Arc::clone(&node))))
            .await
            .expect("repo command prefix registration");
        face.register(node_name, Arc::new(DataEndpoint(Arc::clone(&node))))
            .await
            .expect("repo data prefix registration");
        node
    }

    pub fn counters(&self) -> RepoCounters {
        *self.counters.lock()
    }

    /// Name prefix this node serves stored segments under.
    pub fn node_name(&self) -> &Name {
        &self.node_name
    }

    /// Number of segments currently stored for `file_name`.
    pub fn stored_segments(&self, file_name: &Name) -> usize {
        self.state
            .lock()
            .files
            .get(&file_name.to_uri())
            .map(|f| f.segments.len())
            .unwrap_or(0)
    }

    /// Raw content of one stored segment, for chain inspection.
    pub fn stored_content(&self, file_name: &Name, index: u64) -> Option<Vec<u8>> {
        self.state
            .lock()
            .files
            .get(&file_name.to_uri())
            .and_then(|f| f.segments.get(&index))
            .map(|d| d.content.clone())
    }

    /// Seeds a file directly, bypassing the insert handshake.
    pub fn seed(&self, file_name: &Name, segments: Vec<Data>) {
        let final_index = segments
            .iter()
            .find_map(|d| d.final_block)
            .unwrap_or(segments.len().saturating_sub(1) as u64);
        let stored = StoredFile {
            segments: segments
                .into_iter()
                .enumerate()
                .map(|(i, d)| (i as u64, d))
                .collect(),
            final_index,
        };
        self.state.lock().files.insert(file_name.to_uri(), stored);
    }

    fn respond(&self, interest: &Interest, response: CommandResponse) -> Option<Data> {
        let bytes = response.encode().ok()?;
        Some(Data::new(interest.name.clone(), bytes).with_freshness(Duration::from_secs(1)))
    }

    fn handle_command(&self, interest: &Interest) -> Option<Data> {
        let name = &interest.name;
        let verb_text = name.get(self.repo_prefix.len())?.to_string();
        let verb = Verb::from_wire(&verb_text)?;
        let parameter = match name.get(self.repo_prefix.len() + 1) {
            Some(Component::Generic(bytes)) => CommandParameter::decode(bytes).ok()?,
            _ => CommandParameter::new(),
        };
        debug!(verb = %verb, "repo node command");

        match verb {
            Verb::Insert => self.handle_insert(interest, parameter),
            Verb::InsertCheck => self.handle_insert_check(interest, parameter),
            Verb::Get => self.handle_get(interest, parameter),
            Verb::Delete => self.handle_delete(interest, parameter),
            Verb::DelNode => self.handle_del_node(interest, parameter),
            Verb::Info => {
                let state = self.state.lock();
                let segments: usize = state.files.values().map(|f| f.segments.len()).sum();
                let text = format!(
                    "repository {}: {} files, {} segments stored",
                    self.repo_prefix.to_uri(),
                    state.files.len(),
                    segments
                );
                Some(
                    Data::new(interest.name.clone(), text.into_bytes())
                        .with_freshness(Duration::from_secs(1)),
                )
            }
            Verb::RingInfo => {
                let text = format!(
                    "ring: node {} owns the full key space",
                    self.node_name.to_uri()
                );
                Some(
                    Data::new(interest.name.clone(), text.into_bytes())
                        .with_freshness(Duration::from_secs(1)),
                )
            }
        }
    }

    fn handle_insert(&self, interest: &Interest, parameter: CommandParameter) -> Option<Data> {
        self.counters.lock().inserts += 1;
        let file_name = parameter.name?;

        if let InsertBehavior::Reject(code) = self.behavior {
            return self.respond(
                interest,
                CommandResponse {
                    code,
                    text: Some("insert rejected".to_string()),
                    ..Default::default()
                },
            );
        }

        let process_id = {
            let mut state = self.state.lock();
            state.next_process_id += 1;
            let process_id = state.next_process_id;
            let script = match &self.behavior {
                InsertBehavior::Scripted(values) => Some((values.clone(), 0)),
                _ => None,
            };
            state.processes.insert(
                process_id,
                ProcessStatus {
                    accepted: 0,
                    script,
                },
            );
            process_id
        };

        if matches!(self.behavior, InsertBehavior::Pull) {
            if let Some(node) = self.weak_self.lock().upgrade() {
                tokio::spawn(async move {
                    node.pull_segments(process_id, file_name).await;
                });
            }
        }

        self.respond(
            interest,
            CommandResponse {
                code: 200,
                process_id,
                ..Default::default()
            },
        )
    }

    fn handle_insert_check(&self, interest: &Interest, parameter: CommandParameter) -> Option<Data> {
        self.counters.lock().checks += 1;
        let process_id = parameter.process_id?;
        let mut state = self.state.lock();
        let Some(process) = state.processes.get_mut(&process_id) else {
            return self.respond(
                interest,
                CommandResponse {
                    code: 404,
                    text: Some("unknown process".to_string()),
                    ..Default::default()
                },
            );
        };

        let accepted = match &mut process.script {
            Some((values, next)) => {
                let value = values.get(*next).or(values.last()).copied().unwrap_or(0);
                *next += 1;
                value
            }
            None => process.accepted,
        };

        self.respond(
            interest,
            CommandResponse {
                code: 200,
                process_id,
                insert_num: Some(accepted),
                ..Default::default()
            },
        )
    }

    fn handle_get(&self, interest: &Interest, parameter: CommandParameter) -> Option<Data> {
        self.counters.lock().gets += 1;
        let file_name = parameter.name?;
        let state = self.state.lock();
        let content = match state.files.get(&file_name.to_uri()) {
            Some(stored) => {
                let manifest = Manifest::sharded(
                    file_name.to_uri(),
                    vec![RepoRange {
                        name: self.node_name.to_uri(),
                        start: 0,
                        end: stored.final_index,
                    }],
                );
                manifest.to_json().ok()?.into_bytes()
            }
            // Empty payload signals "not found".
            None => Vec::new(),
        };
        Some(Data::new(interest.name.clone(), content).with_freshness(Duration::from_secs(1)))
    }

    fn handle_delete(&self, interest: &Interest, parameter: CommandParameter) -> Option<Data> {
        self.counters.lock().deletes += 1;
        let file_name = parameter.name?;
        let removed = self.state.lock().files.remove(&file_name.to_uri()).is_some();
        self.respond(
            interest,
            CommandResponse {
                code: if removed { 200 } else { 404 },
                ..Default::default()
            },
        )
    }

    fn handle_del_node(&self, interest: &Interest, parameter: CommandParameter) -> Option<Data> {
        self.counters.lock().del_nodes += 1;
        if parameter.from.is_none() || parameter.to.is_none() {
            return self.respond(
                interest,
                CommandResponse {
                    code: 400,
                    text: Some("missing key-space range".to_string()),
                    ..Default::default()
                },
            );
        }
        self.respond(
            interest,
            CommandResponse {
                code: 200,
                ..Default::default()
            },
        )
    }

    /// Bootstraps from the publisher's manifest, then pulls every segment,
    /// advancing the process's accepted count as segments land.
    async fn pull_segments(self: Arc<Self>, process_id: u64, file_name: Name) {
        let face = self.net.face();
        let lifetime = Duration::from_millis(2000);

        let manifest = match face
            .express(Interest::new(file_name.clone()).with_must_be_fresh(true).with_lifetime(lifetime))
            .await
        {
            Ok(data) => match Manifest::from_json(&String::from_utf8_lossy(&data.content)) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(name = %file_name, error = %e, "bad bootstrap manifest");
                    return;
                }
            },
            Err(e) => {
                warn!(name = %file_name, error = %e, "manifest pull failed");
                return;
            }
        };
        let final_index = manifest.end;

        let mut segments = BTreeMap::new();
        for index in 0..=final_index {
            match face
                .express(
                    Interest::new(file_name.clone().append_segment(index)).with_lifetime(lifetime),
                )
                .await
            {
                Ok(data) => {
                    segments.insert(index, data);
                    self.bump_accepted(process_id);
                }
                Err(e) => {
                    warn!(name = %file_name, index, error = %e, "segment pull failed");
                    return;
                }
            }
        }

        self.state.lock().files.insert(
            file_name.to_uri(),
            StoredFile {
                segments,
                final_index,
            },
        );
        debug!(name = %file_name, segments = final_index + 1, "file stored");
    }

    fn bump_accepted(&self, process_id: u64) {
        if let Some(process) = self.state.lock().processes.get_mut(&process_id) {
            process.accepted += 1;
        }
    }

    fn handle_data(&self, interest: &Interest) -> Option<Data> {
        // <node-name>/data/<file-name...>/<segment>
        let name = &interest.name;
        let marker = name.get(self.node_name.len())?;
        if marker.to_string() != "data" {
            return None;
        }
        let index = name.segment_at(name.len() - 1).ok()?;
        let file_name = name.slice(self.node_name.len() + 1, name.len() - 1);

        let state = self.state.lock();
        let stored = state.files.get(&file_name.to_uri())?;
        let segment = stored.segments.get(&index)?;
        self.counters.lock().data_serves += 1;

        // Re-publish under the fetch namespace name.
        let mut data = Data::new(name.clone(), segment.content.clone())
            .with_freshness(segment.freshness);
        data.final_block = segment.final_block;
        data.signature = segment.signature.clone();
        Some(data)
    }
}

/// Responder for the command namespace.
struct CommandEndpoint(Arc<RepoNode>);

#[async_trait]
impl ProducerHandler for CommandEndpoint {
    async fn on_interest(&self, _prefix: &Name, interest: &Interest) -> Option<Data> {
        self.0.handle_command(interest)
    }
}

/// Responder for the fetch namespace.
struct DataEndpoint(Arc<RepoNode>);

#[async_trait]
impl ProducerHandler for DataEndpoint {
    async fn on_interest(&self, _prefix: &Name, interest: &Interest) -> Option<Data> {
        self.0.handle_data(interest)
    }
}
