use crate::domain_model::*;
use crate::domain_port::*;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub channel: ChannelId,
    pub page_size: PageSize,
    pub max_messages: Option<u64>,
    pub start: PaginationCursor,
}

impl FetchRequest {
    pub fn new(channel: impl Into<ChannelId>, page_size: PageSize) -> Self {
        Self {
            channel: channel.into(),
            page_size,
            max_messages: None,
            start: PaginationCursor::Latest,
        }
    }

    pub fn with_max_messages(mut self, max_messages: Option<u64>) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn starting_from(mut self, cursor: PaginationCursor) -> Self {
        self.start = cursor;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchProgress {
    pub channel: ChannelId,
    pub cursor: PaginationCursor,
    pub fetched: u64,
    pub pages: u64,
}

impl FetchProgress {
    pub fn new(channel: ChannelId, cursor: PaginationCursor) -> Self {
        Self {
            channel,
            cursor,
            fetched: 0,
            pages: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exhausted,
    Cancelled,
    LimitReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Exhausted => "exhausted",
            Termination::Cancelled => "cancelled",
            Termination::LimitReached => "limit-reached",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub progress: FetchProgress,
    pub termination: Termination,
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("invalid fetch request: {0}")]
    InvalidRequest(String),
    #[error("source failure on {} after {} message(s): {source}", .progress.channel, .progress.fetched)]
    Source {
        #[source]
        source: SourceError,
        progress: FetchProgress,
    },
    #[error("store failure on {} after {} message(s): {source}", .progress.channel, .progress.fetched)]
    Store {
        #[source]
        source: StoreError,
        progress: FetchProgress,
    },
    #[error("source returned id {id} which is not older than cursor {}", .progress.cursor)]
    CursorStalled {
        id: MessageId,
        progress: FetchProgress,
    },
}

impl CrawlError {
    pub fn progress(&self) -> Option<&FetchProgress> {
        match self {
            CrawlError::InvalidRequest(_) => None,
            CrawlError::Source { progress, .. }
            | CrawlError::Store { progress, .. }
            | CrawlError::CursorStalled { progress, .. } => Some(progress),
        }
    }

    pub fn resume_cursor(&self) -> Option<PaginationCursor> {
        self.progress().map(|p| p.cursor)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, CrawlError::Source { source, .. } if source.is_transient())
    }
}
