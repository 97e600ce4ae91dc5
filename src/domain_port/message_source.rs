use crate::domain_model::*;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("rate limited by source (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
    #[error("transient source failure: {0}")]
    Transient(String),
    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelId),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("malformed page: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited { .. } | SourceError::Transient(_)
        )
    }
}

/// Paginated read access to a channel's history, newest first.
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    fn max_page_size(&self) -> PageSize;

    /// Returns up to `page_size` messages strictly older than `cursor`,
    /// ordered newest first. An empty page means the history is exhausted.
    async fn fetch_page(
        &self,
        channel: &ChannelId,
        cursor: PaginationCursor,
        page_size: PageSize,
    ) -> Result<Vec<RawMessage>, SourceError>;
}
