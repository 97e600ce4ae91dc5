use crate::application_port::FetchRequest;
use crate::domain_model::*;
use crate::settings::{Crawl, FetchArgs};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub channels: Vec<ChannelId>,
    pub page_size: PageSize,
    pub max_messages: Option<u64>,
    pub start: PaginationCursor,
    pub parallel: bool,
}

impl FetchPlan {
    pub fn from_settings(crawl: &Crawl) -> Self {
        Self {
            channels: crawl.channels.iter().cloned().map(ChannelId).collect(),
            page_size: PageSize(crawl.page_size),
            max_messages: crawl.max_messages,
            start: PaginationCursor::Latest,
            parallel: crawl.parallel_channels,
        }
    }

    pub fn override_with(mut self, args: &FetchArgs) -> Self {
        if !args.channels.is_empty() {
            self.channels = args.channels.iter().cloned().map(ChannelId).collect();
        }
        if let Some(page_size) = args.page_size {
            self.page_size = PageSize(page_size);
        }
        if args.max_messages.is_some() {
            self.max_messages = args.max_messages;
        }
        if let Some(before_id) = args.before_id {
            self.start = PaginationCursor::Before(MessageId(before_id));
        }
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.channels
            .iter()
            .map(|channel| {
                FetchRequest::new(channel.clone(), self.page_size)
                    .with_max_messages(self.max_messages)
                    .starting_from(self.start)
            })
            .collect()
    }
}
