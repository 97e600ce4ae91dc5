use crate::application_port::{FetchProgress, ProgressReporter};
use tracing::info;

#[derive(Debug, Default)]
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn report(&self, progress: &FetchProgress) {
        info!(
            channel = %progress.channel,
            cursor = %progress.cursor,
            pages = progress.pages,
            "fetched {} messages so far",
            progress.fetched
        );
    }
}
