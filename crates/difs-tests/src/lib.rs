//! Test harness for the DIFS workspace.
//!
//! Hosts the in-process [`RepoNode`] the integration suites and the CLI
//! loopback mode talk to, plus shared fixtures.

pub mod fixtures;
pub mod harness;

pub use harness::{InsertBehavior, RepoCounters, RepoNode};
