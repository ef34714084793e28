//! Control commands against the remote repository.
//!
//! Every command follows the same shape: build
//! `<repo-prefix>/<verb>/<encoded-parameters>`, sign it as a command request,
//! express it, and retry on nack or timeout with a budget scoped to this one
//! logical operation. Code 404 surfaces as [`EngineError::NotFound`]; any
//! other code ≥ 400 as [`EngineError::Protocol`].

use std::sync::Arc;
use tracing::{debug, info, warn};

use difs_core::{command_name, CommandParameter, CommandResponse, Manifest, Name, Verb};
use difs_wire::{is_retryable, Data, Face, Interest};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::signer::Signer;

pub struct CommandClient {
    face: Arc<dyn Face>,
    signer: Arc<Signer>,
    config: EngineConfig,
}

impl CommandClient {
    pub fn new(face: Arc<dyn Face>, signer: Arc<Signer>, config: EngineConfig) -> Self {
        Self {
            face,
            signer,
            config,
        }
    }

    /// Expresses one signed command, retrying nack/timeout up to the
    /// configured budget. Each retransmission is re-signed so the timestamp
    /// and nonce stay fresh.
    async fn express_command(
        &self,
        verb: Verb,
        parameter: &CommandParameter,
        must_be_fresh: bool,
        can_be_prefix: bool,
    ) -> Result<Data> {
        let base = command_name(&self.config.repo_prefix, verb, parameter)?;
        let mut attempts = 0u32;
        loop {
            let mut interest = Interest::new(self.signer.sign_command(base.clone()))
                .with_lifetime(self.config.interest_lifetime)
                .with_must_be_fresh(must_be_fresh)
                .with_can_be_prefix(can_be_prefix);
            if let Some(hint) = &self.config.forwarding_hint {
                interest = interest.with_forwarding_hint(hint.clone());
            }

            match self.face.express(interest).await {
                Ok(data) => return Ok(data),
                Err(e) if is_retryable(&e) && attempts < self.config.max_retry => {
                    attempts += 1;
                    warn!(verb = %verb, attempt = attempts, error = %e, "retransmitting command");
                }
                Err(e) => {
                    warn!(verb = %verb, error = %e, "aborting command after retries");
                    return Err(EngineError::Transport {
                        attempts: attempts + 1,
                        source: e,
                    });
                }
            }
        }
    }

    fn decode_response(data: &Data) -> Result<CommandResponse> {
        Ok(CommandResponse::decode(&data.content)?)
    }

    /// Starts an insert; any failure code is fatal for the put.
    pub(crate) async fn insert(&self, name: &Name) -> Result<CommandResponse> {
        let mut parameter = CommandParameter::new().with_name(name.clone());
        if let Some(node_prefix) = &self.config.node_prefix {
            parameter = parameter.with_node_prefix(node_prefix.clone());
        }
        let data = self
            .express_command(Verb::Insert, &parameter, true, false)
            .await?;
        let response = Self::decode_response(&data)?;
        if !response.is_success() {
            return Err(EngineError::Protocol {
                code: response.code,
                text: response.text,
            });
        }
        debug!(process_id = response.process_id, "insert accepted");
        Ok(response)
    }

    /// Polls the progress of a running insert.
    pub(crate) async fn insert_check(
        &self,
        name: &Name,
        process_id: u64,
    ) -> Result<CommandResponse> {
        let mut parameter = CommandParameter::new()
            .with_name(name.clone())
            .with_process_id(process_id);
        if let Some(node_prefix) = &self.config.node_prefix {
            parameter = parameter.with_node_prefix(node_prefix.clone());
        }
        let data = self
            .express_command(Verb::InsertCheck, &parameter, true, false)
            .await?;
        let response = Self::decode_response(&data)?;
        if !response.is_success() {
            return Err(EngineError::Protocol {
                code: response.code,
                text: response.text,
            });
        }
        Ok(response)
    }

    /// Resolves `name` to its manifest. `Ok(None)` means not found (the
    /// repository answers with an empty payload).
    pub(crate) async fn get_manifest(&self, name: &Name) -> Result<Option<Manifest>> {
        let parameter = CommandParameter::new().with_name(name.clone());
        let data = self
            .express_command(Verb::Get, &parameter, true, true)
            .await?;
        if data.content.is_empty() {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&data.content);
        Ok(Some(Manifest::from_json(&text)?))
    }

    /// Deletes a stored file by name.
    pub async fn delete(&self, name: &Name) -> Result<()> {
        let parameter = CommandParameter::new()
            .with_process_id(0)
            .with_name(name.clone());
        let data = self
            .express_command(Verb::Delete, &parameter, true, false)
            .await?;
        let response = Self::decode_response(&data)?;
        if response.is_not_found() {
            warn!(name = %name, "manifest not found");
            return Err(EngineError::NotFound);
        }
        if !response.is_success() {
            return Err(EngineError::Protocol {
                code: response.code,
                text: response.text,
            });
        }
        info!(name = %name, "deleted");
        Ok(())
    }

    /// Deletes every key in the `[from, to]` key-space range.
    pub async fn delete_range(&self, from: Vec<u8>, to: Vec<u8>) -> Result<()> {
        let parameter = CommandParameter::new().with_range(from, to);
        let data = self
            .express_command(Verb::DelNode, &parameter, true, false)
            .await?;
        let response = Self::decode_response(&data)?;
        if response.is_not_found() {
            warn!("key-space range not found");
            return Err(EngineError::NotFound);
        }
        if !response.is_success() {
            return Err(EngineError::Protocol {
                code: response.code,
                text: response.text,
            });
        }
        info!("key-space range deleted");
        Ok(())
    }

    /// Human-readable repository status.
    pub async fn info(&self) -> Result<String> {
        let parameter = CommandParameter::new();
        let data = self
            .express_command(Verb::Info, &parameter, false, false)
            .await?;
        Ok(String::from_utf8_lossy(&data.content).into_owned())
    }

    /// Human-readable ring/key-space layout.
    pub async fn ring_info(&self) -> Result<String> {
        let parameter = CommandParameter::new();
        let data = self
            .express_command(Verb::RingInfo, &parameter, false, false)
            .await?;
        Ok(String::from_utf8_lossy(&data.content).into_owned())
    }
}
