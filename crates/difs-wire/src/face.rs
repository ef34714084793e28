//! The wire-endpoint contract consumed by the engine.
//!
//! A [`Face`] sends requests and installs producers. Exactly one outcome is
//! reported per expressed request: a satisfying [`Data`], a nack, or a
//! lifetime timeout — the latter two as [`WireError`] variants. Producer
//! callbacks are serialized by the substrate; a producer must never express
//! a new request inline from `on_interest` (spawn a task instead).

use async_trait::async_trait;
use std::sync::Arc;

use difs_core::Name;

use crate::error::Result;
use crate::packet::{Data, Interest};

/// A responder installed under a name prefix.
#[async_trait]
pub trait ProducerHandler: Send + Sync {
    /// Handles one incoming request. `None` nacks the request.
    async fn on_interest(&self, prefix: &Name, interest: &Interest) -> Option<Data>;
}

/// A bidirectional endpoint on the request/response substrate.
#[async_trait]
pub trait Face: Send + Sync {
    /// Sends a request and waits for its single outcome.
    async fn express(&self, interest: Interest) -> Result<Data>;

    /// Installs `handler` as the responder for `prefix`.
    async fn register(&self, prefix: Name, handler: Arc<dyn ProducerHandler>) -> Result<()>;
}
