use crate::domain_model::*;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt record in {path} at line {line}: {reason}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(String),
}

/// Durable keyed storage for normalized messages.
///
/// `upsert` is keyed by `(channel, id)` and must be idempotent: writing the
/// same record twice leaves one record behind. Implementations must tolerate
/// concurrent writers for different channels.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn upsert(&self, message: &NormalizedMessage) -> Result<(), StoreError>;

    async fn list_channel(&self, channel: &ChannelId)
    -> Result<Vec<NormalizedMessage>, StoreError>;

    async fn count(&self, channel: &ChannelId) -> Result<u64, StoreError>;

    async fn close(&self) {}
}
