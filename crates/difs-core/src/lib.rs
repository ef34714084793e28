//! Core data model for the DIFS client engine.
//!
//! This crate holds the value types shared by every other DIFS crate: the
//! hierarchical [`Name`], the hash-chained segment content layout, the
//! manifest record, and the repository command/response model. It performs no
//! I/O and owns no state.

pub mod command;
pub mod error;
pub mod manifest;
pub mod name;
pub mod segment;

pub use command::{command_name, CommandParameter, CommandResponse, Verb};
pub use error::{CoreError, Result};
pub use manifest::{Manifest, RepoRange};
pub use name::{Component, Name};
pub use segment::{chain_content, split_chain_content, CHAIN_HASH_LEN, ZERO_HASH};
