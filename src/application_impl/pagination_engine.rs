use crate::application_impl::normalize;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Walks a channel's history from newest to oldest, one page at a time,
/// persisting every page before asking for the next one.
///
/// Cancellation is only observed between pages (including while waiting for
/// the pacer), never during a fetch or while a page is being written.
pub struct PaginationEngine {
    source: Arc<dyn MessageSource>,
    store: Arc<dyn MessageStore>,
    pacer: Arc<dyn Pacer>,
    reporter: Arc<dyn ProgressReporter>,
}

impl PaginationEngine {
    pub fn new(
        source: Arc<dyn MessageSource>,
        store: Arc<dyn MessageStore>,
        pacer: Arc<dyn Pacer>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            source,
            store,
            pacer,
            reporter,
        }
    }

    fn validate(&self, request: &FetchRequest) -> Result<(), CrawlError> {
        if request.page_size.is_zero() {
            return Err(CrawlError::InvalidRequest(
                "page size must be positive".to_string(),
            ));
        }
        let max_page_size = self.source.max_page_size();
        if request.page_size > max_page_size {
            return Err(CrawlError::InvalidRequest(format!(
                "page size {} exceeds the source maximum of {}",
                request.page_size, max_page_size
            )));
        }
        if request.max_messages == Some(0) {
            return Err(CrawlError::InvalidRequest(
                "max messages must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn next_page_size(request: &FetchRequest, progress: &FetchProgress) -> PageSize {
        match request.max_messages {
            Some(max) => request
                .page_size
                .clamp_to(max.saturating_sub(progress.fetched)),
            None => request.page_size,
        }
    }

    fn oldest_admitted(
        progress: &FetchProgress,
        page: &[RawMessage],
    ) -> Result<MessageId, CrawlError> {
        if let Some(stalled) = page.iter().find(|m| !progress.cursor.admits(m.id)) {
            return Err(CrawlError::CursorStalled {
                id: stalled.id,
                progress: progress.clone(),
            });
        }
        page.iter()
            .map(|m| m.id)
            .min()
            .ok_or_else(|| CrawlError::InvalidRequest("empty page has no oldest id".to_string()))
    }

    fn finish(progress: FetchProgress, termination: Termination) -> FetchReport {
        match termination {
            Termination::Cancelled => warn!(
                channel = %progress.channel,
                cursor = %progress.cursor,
                fetched = progress.fetched,
                "fetch cancelled"
            ),
            Termination::Exhausted | Termination::LimitReached => info!(
                channel = %progress.channel,
                cursor = %progress.cursor,
                fetched = progress.fetched,
                %termination,
                "fetch finished"
            ),
        }
        FetchReport {
            progress,
            termination,
        }
    }

    #[tracing::instrument(skip_all, fields(channel = %request.channel))]
    pub async fn run(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchReport, CrawlError> {
        self.validate(request)?;

        let channel = &request.channel;
        let mut progress = FetchProgress::new(channel.clone(), request.start);
        info!(cursor = %progress.cursor, page_size = %request.page_size, "start fetching");

        loop {
            if cancel.is_cancelled() {
                return Ok(Self::finish(progress, Termination::Cancelled));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Ok(Self::finish(progress, Termination::Cancelled));
                }
                _ = self.pacer.wait_turn() => {}
            }

            let page_size = Self::next_page_size(request, &progress);
            let page = match self
                .source
                .fetch_page(channel, progress.cursor, page_size)
                .await
            {
                Ok(page) => page,
                Err(source) => {
                    error!(error = %source, cursor = %progress.cursor, "source failure");
                    return Err(CrawlError::Source { source, progress });
                }
            };
            debug!(cursor = %progress.cursor, received = page.len(), "page fetched");

            if page.is_empty() {
                return Ok(Self::finish(progress, Termination::Exhausted));
            }

            let oldest = Self::oldest_admitted(&progress, &page)
                .inspect_err(|e| error!(error = %e, "cursor did not advance"))?;

            for raw in page {
                let message = normalize(channel, raw);
                if let Err(source) = self.store.upsert(&message).await {
                    error!(error = %source, id = %message.id, "store failure");
                    return Err(CrawlError::Store { source, progress });
                }
                progress.fetched += 1;
            }

            progress.cursor = PaginationCursor::Before(oldest);
            progress.pages += 1;
            self.reporter.report(&progress);

            if let Some(max) = request.max_messages {
                if progress.fetched >= max {
                    return Ok(Self::finish(progress, Termination::LimitReached));
                }
            }
        }
    }
}
