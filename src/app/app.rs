use crate::app::FetchPlan;
use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_file::*;
use crate::infra_http::*;
use crate::infra_memory::*;
use crate::infra_mongo::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use anyhow::{Context, anyhow};
use futures_util::future::join_all;
use nanoid::nanoid;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: ChannelId,
    pub result: Result<FetchReport, CrawlError>,
}

pub struct App {
    pub source: Arc<dyn MessageSource>,
    pub store: Arc<dyn MessageStore>,
    pacer: Arc<dyn Pacer>,
    reporter: Arc<dyn ProgressReporter>,
    run_id: String,
}

impl App {
    pub fn new(
        source: Arc<dyn MessageSource>,
        store: Arc<dyn MessageStore>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        let alphabet: [char; 16] = [
            '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
        ];
        Self {
            source,
            store,
            pacer,
            reporter: Arc::new(TracingProgressReporter),
            run_id: nanoid!(10, &alphabet),
        }
    }

    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let source: Arc<dyn MessageSource> = match settings.source.backend.as_str() {
            "fake" => Arc::new(
                FakeMessageSource::synthetic(settings.source.fake_history_len)
                    .with_max_page_size(PageSize(settings.source.max_page_size)),
            ),
            "http" => {
                let base_url = settings
                    .source
                    .base_url
                    .clone()
                    .ok_or_else(|| anyhow!("source.base_url is required for the http backend"))?;
                let token = match &settings.source.token_env {
                    Some(var) => Some(
                        std::env::var(var)
                            .with_context(|| format!("reading the API token from ${var}"))?,
                    ),
                    None => None,
                };
                Arc::new(HttpMessageSource::try_new(HttpSourceConfig {
                    base_url,
                    token,
                    timeout: Duration::from_secs(settings.source.request_timeout_secs),
                    max_page_size: PageSize(settings.source.max_page_size),
                })?)
            }
            other => return Err(anyhow!("Unknown source backend: {}", other)),
        };

        let store: Arc<dyn MessageStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(InMemoryMessageStore::new()),
            "file" => {
                let dir = settings.store.dir.as_deref().unwrap_or(DEFAULT_DATA_DIR);
                Arc::new(JsonlMessageStore::open(dir).await?)
            }
            "mysql" => {
                let dsn = settings
                    .store
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.mysql_dsn is required for the mysql backend"))?;
                Arc::new(MySqlMessageStore::connect(dsn).await?)
            }
            "redis" => {
                let dsn = settings
                    .store
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.redis_dsn is required for the redis backend"))?;
                Arc::new(RedisMessageStore::connect(dsn, settings.store.redis_prefix.clone()).await?)
            }
            "mongo" => {
                let dsn = settings
                    .store
                    .mongo_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.mongo_dsn is required for the mongo backend"))?;
                Arc::new(
                    MongoMessageStore::connect(
                        dsn,
                        &settings.store.mongo_database,
                        &settings.store.mongo_collection,
                    )
                    .await?,
                )
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let pacer = Arc::new(IntervalPacer::per_second(settings.crawl.rate_limit)?);

        let app = Self::new(source, store, pacer);
        info!(
            run_id = %app.run_id,
            source = %settings.source.backend,
            store = %settings.store.backend,
            "archiver ready"
        );
        Ok(app)
    }

    pub fn engine(&self) -> PaginationEngine {
        PaginationEngine::new(
            self.source.clone(),
            self.store.clone(),
            self.pacer.clone(),
            self.reporter.clone(),
        )
    }

    pub async fn fetch(&self, plan: &FetchPlan, cancel: &CancellationToken) -> Vec<ChannelOutcome> {
        let span = info_span!("fetch", run_id = %self.run_id);
        async {
            let requests = plan.requests();
            if plan.parallel {
                join_all(requests.iter().map(|request| self.fetch_one(request, cancel))).await
            } else {
                let mut outcomes = Vec::with_capacity(requests.len());
                for request in &requests {
                    outcomes.push(self.fetch_one(request, cancel).await);
                }
                outcomes
            }
        }
        .instrument(span)
        .await
    }

    async fn fetch_one(&self, request: &FetchRequest, cancel: &CancellationToken) -> ChannelOutcome {
        let result = self.engine().run(request, cancel).await;
        ChannelOutcome {
            channel: request.channel.clone(),
            result,
        }
    }

    pub async fn shutdown(&self) {
        info!("archiver shutting down...");
        self.store.close().await;
    }
}
