use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::{anyhow, ensure};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub max_page_size: PageSize,
}

/// Source backed by a paginated JSON endpoint:
/// `GET {base_url}/channels/{channel}/messages?limit=N[&before_id=ID]`
/// answering with an array of messages, newest first.
pub struct HttpMessageSource {
    client: Client,
    base_url: Url,
    token: Option<String>,
    max_page_size: PageSize,
}

impl HttpMessageSource {
    pub fn try_new(config: HttpSourceConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow!("invalid source base url {:?}: {e}", config.base_url))?;
        ensure!(
            !base_url.cannot_be_a_base(),
            "source base url {:?} cannot carry a path",
            config.base_url
        );
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("channel-archiver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token,
            max_page_size: config.max_page_size,
        })
    }

    pub fn page_url(&self, channel: &ChannelId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["channels", channel.as_str(), "messages"]);
        }
        url
    }

    fn classify(channel: &ChannelId, status: StatusCode, retry_after: Option<Duration>) -> SourceError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited { retry_after },
            StatusCode::NOT_FOUND => SourceError::ChannelNotFound(channel.clone()),
            StatusCode::REQUEST_TIMEOUT => SourceError::Transient(status.to_string()),
            s if s.is_server_error() => SourceError::Transient(s.to_string()),
            s => SourceError::Rejected(s.to_string()),
        }
    }
}

fn transport_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        SourceError::Transient(e.to_string())
    } else {
        SourceError::Rejected(e.to_string())
    }
}

// The status line arrived, so a failure here is the connection, not the payload.
fn body_error(e: reqwest::Error) -> SourceError {
    SourceError::Transient(format!("reading response body: {e}"))
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait::async_trait]
impl MessageSource for HttpMessageSource {
    fn max_page_size(&self) -> PageSize {
        self.max_page_size
    }

    async fn fetch_page(
        &self,
        channel: &ChannelId,
        cursor: PaginationCursor,
        page_size: PageSize,
    ) -> Result<Vec<RawMessage>, SourceError> {
        let mut request = self
            .client
            .get(self.page_url(channel))
            .query(&[("limit", page_size.0.to_string())]);
        if let Some(before) = cursor.before_id() {
            request = request.query(&[("before_id", before.0.to_string())]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::classify(
                channel,
                status,
                retry_after(response.headers()),
            ));
        }

        let body = response.bytes().await.map_err(body_error)?;
        serde_json::from_slice::<Vec<RawMessage>>(&body)
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }
}
