//! Command-line surface for the DIFS client.
//!
//! Every subcommand currently runs against an in-process loopback network
//! with an embedded repository node: the full put/get/command machinery is
//! exercised end to end without an external forwarder. Linking a production
//! forwarder binding replaces the loopback wiring, not this front-end.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use difs_core::Name;
use difs_engine::{
    ChainDigest, CommandClient, EngineConfig, Fetcher, Publisher, Signer, SigningMode,
};
use difs_tests::{InsertBehavior, RepoNode};
use difs_wire::MemNetwork;

#[derive(Parser)]
#[command(name = "difs", about = "DIFS distributed file repository client", long_about = None)]
pub struct Cli {
    /// Verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChainDigestArg {
    Sha256,
    Blake2s,
}

impl From<ChainDigestArg> for ChainDigest {
    fn from(arg: ChainDigestArg) -> Self {
        match arg {
            ChainDigestArg::Sha256 => ChainDigest::Sha256,
            ChainDigestArg::Blake2s => ChainDigest::Blake2s,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Publish a file (or stdin with `-`) under a name.
    Put {
        /// Sign segment 0 with a bare SHA-256 digest instead of an identity.
        #[arg(short = 'D', long, conflicts_with = "data_identity")]
        digest: bool,

        /// Digest algorithm for the segment hash chain.
        #[arg(long, value_enum, default_value_t = ChainDigestArg::Sha256)]
        chain_digest: ChainDigestArg,

        /// Identity name used to sign segment 0.
        #[arg(short = 'i', long)]
        data_identity: Option<String>,

        /// Freshness period of published segments, in milliseconds.
        #[arg(short = 'x', long, default_value_t = 10_000)]
        freshness_ms: u64,

        /// Request lifetime, in milliseconds.
        #[arg(short = 'l', long, default_value_t = 4000)]
        lifetime_ms: u64,

        /// Overall timeout for the whole put, in milliseconds.
        #[arg(short = 'w', long)]
        timeout_ms: Option<u64>,

        /// Segment block size in bytes (chain hash slot included).
        #[arg(short = 's', long, default_value_t = 1000)]
        block_size: usize,

        repo_prefix: String,
        name: String,
        file: String,
    },

    /// Retrieve a stored file into a local file (or stdout with `-`).
    Get {
        #[arg(short = 'l', long, default_value_t = 4000)]
        lifetime_ms: u64,

        #[arg(short = 'w', long)]
        timeout_ms: Option<u64>,

        repo_prefix: String,
        name: String,
        file: String,
    },

    /// Delete a stored file by name.
    Delete { repo_prefix: String, name: String },

    /// Delete every key in a key-space range.
    DelNode {
        repo_prefix: String,
        from: String,
        to: String,
    },

    /// Print repository status.
    Info { repo_prefix: String },

    /// Print ring/key-space layout.
    RingInfo { repo_prefix: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Put {
                digest,
                chain_digest,
                data_identity,
                freshness_ms,
                lifetime_ms,
                timeout_ms,
                block_size,
                repo_prefix,
                name,
                file,
            } => {
                let config = EngineConfig {
                    repo_prefix: parse_name(&repo_prefix)?,
                    block_size,
                    freshness_period: Duration::from_millis(freshness_ms),
                    interest_lifetime: Duration::from_millis(lifetime_ms),
                    timeout: timeout_ms.map(Duration::from_millis),
                    signing: if digest {
                        SigningMode::DigestSha256
                    } else {
                        SigningMode::Identity
                    },
                    chain_digest: chain_digest.into(),
                    ..Default::default()
                };
                let (face, signer) = loopback(&config, data_identity.as_deref()).await;

                let publisher = Publisher::new(face, signer, config);
                let outcome = publisher
                    .put(parse_name(&name)?, input(&file)?)
                    .await
                    .context("put failed")?;
                println!(
                    "stored {} under {}: {} segments, {} bytes (process {})",
                    file, name, outcome.segments, outcome.total_bytes, outcome.process_id
                );
                Ok(())
            }

            Command::Get {
                lifetime_ms,
                timeout_ms,
                repo_prefix,
                name,
                file,
            } => {
                let config = EngineConfig {
                    repo_prefix: parse_name(&repo_prefix)?,
                    interest_lifetime: Duration::from_millis(lifetime_ms),
                    timeout: timeout_ms.map(Duration::from_millis),
                    ..Default::default()
                };
                let (face, signer) = loopback(&config, None).await;

                let fetcher = Fetcher::new(face, signer, config);
                let mut sink = output(&file)?;
                let stats = fetcher
                    .get(parse_name(&name)?, &mut sink)
                    .await
                    .context("get failed")?;
                eprintln!(
                    "received {} segments, {} bytes",
                    stats.segments, stats.total_bytes
                );
                Ok(())
            }

            Command::Delete { repo_prefix, name } => {
                let (client, name) = command_client(&repo_prefix, &name).await?;
                client.delete(&name).await.context("delete failed")?;
                println!("deleted {}", name);
                Ok(())
            }

            Command::DelNode {
                repo_prefix,
                from,
                to,
            } => {
                let (client, _) = command_client(&repo_prefix, "/").await?;
                client
                    .delete_range(from.into_bytes(), to.into_bytes())
                    .await
                    .context("del-node failed")?;
                println!("key-space range deleted");
                Ok(())
            }

            Command::Info { repo_prefix } => {
                let (client, _) = command_client(&repo_prefix, "/").await?;
                println!("{}", client.info().await.context("info failed")?);
                Ok(())
            }

            Command::RingInfo { repo_prefix } => {
                let (client, _) = command_client(&repo_prefix, "/").await?;
                println!("{}", client.ring_info().await.context("ring-info failed")?);
                Ok(())
            }
        }
    }
}

fn parse_name(uri: &str) -> Result<Name> {
    Name::parse(uri).with_context(|| format!("invalid name '{uri}'"))
}

/// Wires the in-process loopback network: one embedded repository node plus
/// a fresh client face and signer.
async fn loopback(
    config: &EngineConfig,
    identity: Option<&str>,
) -> (Arc<dyn difs_wire::Face>, Arc<Signer>) {
    let net = MemNetwork::new();
    RepoNode::start(
        &net,
        config.repo_prefix.clone(),
        Name::new().append_str("node0"),
        InsertBehavior::Pull,
    )
    .await;
    let signer = Arc::new(Signer::generate(identity.unwrap_or("difs-cli")));
    let face: Arc<dyn difs_wire::Face> = Arc::new(net.face());
    (face, signer)
}

async fn command_client(repo_prefix: &str, name: &str) -> Result<(CommandClient, Name)> {
    let config = EngineConfig {
        repo_prefix: parse_name(repo_prefix)?,
        ..Default::default()
    };
    let (face, signer) = loopback(&config, None).await;
    Ok((CommandClient::new(face, signer, config), parse_name(name)?))
}

fn input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        Ok(Box::new(std::io::stdin()))
    } else {
        let file = File::open(path).with_context(|| format!("cannot open {path}"))?;
        Ok(Box::new(file))
    }
}

fn output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(std::io::stdout()))
    } else {
        let file = File::create(path).with_context(|| format!("cannot create {path}"))?;
        Ok(Box::new(file))
    }
}
