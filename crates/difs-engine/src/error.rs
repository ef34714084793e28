use thiserror::Error;

use difs_core::CoreError;
use difs_wire::WireError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A request/response pair failed after exhausting its retry budget.
    #[error("transport failure after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: WireError,
    },

    /// The repository answered with a failure code.
    #[error("command failed with code {code}")]
    Protocol { code: u16, text: Option<String> },

    /// The named file is not in the repository.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("prefix registration failed for {prefix}: {reason}")]
    Registration { prefix: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Malformed or missing segment content during reassembly.
    #[error("integrity failure at segment {segment}: {reason}")]
    Integrity { segment: u64, reason: String },

    /// The optional overall deadline elapsed.
    #[error("operation timed out after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
