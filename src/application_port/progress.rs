use crate::application_port::FetchProgress;
use tokio::sync::watch;

pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &FetchProgress);
}

impl ProgressReporter for watch::Sender<Option<FetchProgress>> {
    fn report(&self, progress: &FetchProgress) {
        self.send_replace(Some(progress.clone()));
    }
}
