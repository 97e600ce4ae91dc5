use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub channel: ChannelId,
    pub cursor: PaginationCursor,
    pub page_size: PageSize,
}

#[derive(Debug)]
enum Mode {
    Paged,
    Stuck(Vec<RawMessage>),
}

/// In-process source serving a fixed history, newest first.
#[derive(Debug)]
pub struct FakeMessageSource {
    history: BTreeMap<MessageId, RawMessage>,
    max_page_size: PageSize,
    mode: Mode,
    calls: Mutex<Vec<FetchCall>>,
    failures: Mutex<HashMap<usize, SourceError>>,
}

impl FakeMessageSource {
    pub const DEFAULT_MAX_PAGE_SIZE: PageSize = PageSize(100);

    pub fn from_messages(messages: impl IntoIterator<Item = RawMessage>) -> Self {
        Self {
            history: messages.into_iter().map(|m| (m.id, m)).collect(),
            max_page_size: Self::DEFAULT_MAX_PAGE_SIZE,
            mode: Mode::Paged,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn synthetic(len: u64) -> Self {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        Self::from_messages((1..=len).map(Self::synthetic_message))
    }

    pub fn stuck(page: Vec<RawMessage>) -> Self {
        let mut source = Self::from_messages(Vec::new());
        source.mode = Mode::Stuck(page);
        source
    }

    pub fn with_max_page_size(mut self, max_page_size: PageSize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    pub fn fail_on_call(self, call: usize, error: SourceError) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(call, error);
        }
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn synthetic_message(id: i64) -> RawMessage {
        // 2024-09-01T00:00:00Z
        let epoch = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_725_148_800);
        let date = epoch + Duration::minutes(97 * id);
        let message = RawMessage::new(MessageId(id), date)
            .with_sender(json!({"_": "PeerUser", "user_id": 1000 + id % 7}))
            .with_text(format!("synthetic message #{id}"))
            .with_field("views", json!(id * 3));
        if id % 10 == 0 {
            message.with_media(json!({"_": "MessageMediaPhoto", "bytes": "AAAA"}))
        } else {
            message
        }
    }

    fn record(&self, call: FetchCall) -> usize {
        match self.calls.lock() {
            Ok(mut calls) => {
                calls.push(call);
                calls.len() - 1
            }
            Err(_) => 0,
        }
    }

    fn scheduled_failure(&self, call: usize) -> Option<SourceError> {
        self.failures
            .lock()
            .ok()
            .and_then(|mut failures| failures.remove(&call))
    }
}

#[async_trait::async_trait]
impl MessageSource for FakeMessageSource {
    fn max_page_size(&self) -> PageSize {
        self.max_page_size
    }

    async fn fetch_page(
        &self,
        channel: &ChannelId,
        cursor: PaginationCursor,
        page_size: PageSize,
    ) -> Result<Vec<RawMessage>, SourceError> {
        let call = self.record(FetchCall {
            channel: channel.clone(),
            cursor,
            page_size,
        });
        if let Some(error) = self.scheduled_failure(call) {
            return Err(error);
        }

        if let Mode::Stuck(page) = &self.mode {
            return Ok(page.clone());
        }

        let older = match cursor.before_id() {
            Some(before) => self.history.range(..before),
            None => self.history.range(..),
        };
        Ok(older
            .rev()
            .take(page_size.as_usize())
            .map(|(_, m)| m.clone())
            .collect())
    }
}
