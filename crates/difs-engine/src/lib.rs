//! Client-side engine of the DIFS distributed file repository.
//!
//! The engine ingests a local byte stream as an ordered sequence of signed,
//! hash-chained segments published under a caller-chosen name
//! ([`Publisher`]), retrieves such a sequence by resolving a manifest and
//! pulling segments in bounded windows ([`Fetcher`]), and issues out-of-band
//! control operations against the repository ([`CommandClient`]). All of it
//! runs over the abstract [`difs_wire::Face`] endpoint; transport scheduling
//! below the request/response boundary is an external concern.

pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod publisher;
pub mod segmenter;
pub mod signer;

pub use commands::CommandClient;
pub use config::{
    ChainDigest, EngineConfig, SigningMode, DEFAULT_BLOCK_SIZE, DEFAULT_CHECK_PERIOD,
    DEFAULT_FETCH_WINDOW, DEFAULT_FRESHNESS_PERIOD, DEFAULT_INTEREST_LIFETIME, DEFAULT_MAX_RETRY,
    DEFAULT_PRE_SIGN_WINDOW,
};
pub use error::{EngineError, Result};
pub use fetcher::{FetchStats, Fetcher};
pub use publisher::{Publisher, PutOutcome};
pub use segmenter::Segmenter;
pub use signer::{verify_data_identity, Identity, Signer};
