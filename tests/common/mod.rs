//! Doubles shared by the integration tests.

#![allow(dead_code)]

use channel_archiver::application_impl::*;
use channel_archiver::application_port::*;
use channel_archiver::domain_model::*;
use channel_archiver::domain_port::*;
use channel_archiver::infra_memory::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Cancels `cancel` once a run has published `pages` pages.
pub struct CancelAfterPages {
    pub pages: u64,
    pub cancel: CancellationToken,
}

impl ProgressReporter for CancelAfterPages {
    fn report(&self, progress: &FetchProgress) {
        if progress.pages >= self.pages {
            self.cancel.cancel();
        }
    }
}

/// Memory store that refuses every write after the first `writes`.
pub struct FailingStore {
    pub inner: InMemoryMessageStore,
    remaining: AtomicUsize,
}

impl FailingStore {
    pub fn after(writes: usize) -> Self {
        Self {
            inner: InMemoryMessageStore::new(),
            remaining: AtomicUsize::new(writes),
        }
    }
}

#[async_trait::async_trait]
impl MessageStore for FailingStore {
    async fn upsert(&self, message: &NormalizedMessage) -> Result<(), StoreError> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| StoreError::Store("disk full".to_string()))?;
        self.inner.upsert(message).await
    }

    async fn list_channel(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<NormalizedMessage>, StoreError> {
        self.inner.list_channel(channel).await
    }

    async fn count(&self, channel: &ChannelId) -> Result<u64, StoreError> {
        self.inner.count(channel).await
    }
}

pub fn unpaced() -> Arc<dyn Pacer> {
    Arc::new(IntervalPacer::new(Duration::ZERO))
}

pub fn engine(source: Arc<dyn MessageSource>, store: Arc<dyn MessageStore>) -> PaginationEngine {
    PaginationEngine::new(source, store, unpaced(), Arc::new(TracingProgressReporter))
}

pub async fn stored_ids(store: &dyn MessageStore, channel: &str) -> Vec<i64> {
    store
        .list_channel(&ChannelId::from(channel))
        .await
        .unwrap()
        .iter()
        .map(|m| m.id.0)
        .collect()
}
