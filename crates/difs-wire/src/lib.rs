//! Wire-endpoint contract for the DIFS client engine.
//!
//! Defines the [`Interest`]/[`Data`] packet model, the [`Face`] trait the
//! engine drives, and [`MemNetwork`], an in-memory substrate used by the
//! integration tests and the CLI loopback mode. The NDN wire codec itself
//! (TLV framing, forwarder links) is an external collaborator; a production
//! binding implements [`Face`] outside this workspace.

pub mod error;
pub mod face;
pub mod mem;
pub mod packet;

pub use error::{is_retryable, Result, WireError};
pub use face::{Face, ProducerHandler};
pub use mem::{FaultAction, MemFace, MemNetwork};
pub use packet::{Data, Interest, SignatureInfo, SignatureKind, DEFAULT_FRESHNESS, DEFAULT_LIFETIME};
