use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("nack received for {name}")]
    Nack { name: String },

    #[error("request for {name} timed out after {lifetime_ms}ms")]
    Timeout { name: String, lifetime_ms: u64 },

    #[error("prefix registration failed for {prefix}: {reason}")]
    Registration { prefix: String, reason: String },
}

/// Transient failures worth retransmitting; registration failures are not.
pub fn is_retryable(error: &WireError) -> bool {
    match error {
        WireError::Nack { .. } => true,
        WireError::Timeout { .. } => true,
        WireError::Registration { .. } => false,
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
