use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid name '{uri}': {reason}")]
    InvalidName { uri: String, reason: String },

    #[error("component at index {index} is not a segment component")]
    NotASegment { index: usize },

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("command codec error: {0}")]
    Codec(String),

    #[error("chained content too short: {len} bytes")]
    ShortContent { len: usize },
}

pub type Result<T> = std::result::Result<T, CoreError>;
