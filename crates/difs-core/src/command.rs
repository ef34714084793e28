//! Repository command parameters, responses, and verbs.
//!
//! A command travels as a request whose name is
//! `<repo-prefix>/<verb>/<encoded-parameters>`. The parameter block is an
//! opaque byte component; replies decode to a [`CommandResponse`] with
//! HTTP-like status codes (`< 400` success or in-progress, `404` not found).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::name::Name;

/// Command verbs understood by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Insert,
    InsertCheck,
    Delete,
    DelNode,
    Get,
    Info,
    RingInfo,
}

impl Verb {
    /// The verb's wire name, carried as a single name component.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Verb::Insert => "insert",
            Verb::InsertCheck => "insert check",
            Verb::Delete => "delete",
            Verb::DelNode => "del-node",
            Verb::Get => "get",
            Verb::Info => "info",
            Verb::RingInfo => "ringInfo",
        }
    }

    /// Parses a wire name back into a verb.
    pub fn from_wire(text: &str) -> Option<Verb> {
        match text {
            "insert" => Some(Verb::Insert),
            "insert check" => Some(Verb::InsertCheck),
            "delete" => Some(Verb::Delete),
            "del-node" => Some(Verb::DelNode),
            "get" => Some(Verb::Get),
            "info" => Some(Verb::Info),
            "ringInfo" => Some(Verb::RingInfo),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Parameter block attached to a command. All fields optional; each verb
/// fills the subset it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandParameter {
    pub name: Option<Name>,
    pub process_id: Option<u64>,
    pub from: Option<Vec<u8>>,
    pub to: Option<Vec<u8>>,
    pub node_prefix: Option<Name>,
}

impl CommandParameter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: Name) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_process_id(mut self, process_id: u64) -> Self {
        self.process_id = Some(process_id);
        self
    }

    pub fn with_range(mut self, from: Vec<u8>, to: Vec<u8>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_node_prefix(mut self, node_prefix: Name) -> Self {
        self.node_prefix = Some(node_prefix);
        self
    }

    /// Encodes the block into opaque wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CoreError::Codec(e.to_string()))
    }

    /// Decodes a block from wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| CoreError::Codec(e.to_string()))
    }
}

/// Reply to a command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// HTTP-like status code.
    pub code: u16,
    /// Optional human-readable detail.
    pub text: Option<String>,
    /// Token tying an insert to its subsequent check polls.
    pub process_id: u64,
    /// Number of segments the repository has accepted so far.
    pub insert_num: Option<u64>,
}

impl CommandResponse {
    /// Success or in-progress.
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Distinguished "not found" reply.
    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CoreError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| CoreError::Codec(e.to_string()))
    }
}

/// Builds the unsigned command name `<prefix>/<verb>/<encoded-parameters>`.
pub fn command_name(prefix: &Name, verb: Verb, parameter: &CommandParameter) -> Result<Name> {
    Ok(prefix
        .clone()
        .append_str(verb.wire_name())
        .append_bytes(parameter.encode()?))
}
