use anyhow::{Result, anyhow, ensure};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub source: Source,
    pub store: Store,
    pub crawl: Crawl,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Source {
    pub backend: String, // "fake" or "http"
    pub base_url: Option<String>,
    /// Environment variable holding the API token.
    pub token_env: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u16,
    #[serde(default)]
    pub fake_history_len: u64,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory", "file", "mysql", "redis" or "mongo"
    pub dir: Option<String>,
    pub mysql_dsn: Option<String>,
    pub redis_dsn: Option<String>,
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
    pub mongo_dsn: Option<String>,
    #[serde(default = "default_mongo_database")]
    pub mongo_database: String,
    #[serde(default = "default_mongo_collection")]
    pub mongo_collection: String,
}

#[derive(Debug, Deserialize)]
pub struct Crawl {
    #[serde(default)]
    pub channels: Vec<String>,
    pub page_size: u16,
    /// Requests per second.
    pub rate_limit: f64,
    pub max_messages: Option<u64>,
    #[serde(default)]
    pub parallel_channels: bool,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_page_size() -> u16 {
    100
}

fn default_mongo_database() -> String {
    "archive".to_string()
}

fn default_mongo_collection() -> String {
    "messages".to_string()
}

fn default_redis_prefix() -> String {
    "messages".to_string()
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.crawl.rate_limit.is_finite() && self.crawl.rate_limit > 0.0,
            "crawl.rate_limit must be a positive number, got {}",
            self.crawl.rate_limit
        );
        ensure!(self.crawl.page_size > 0, "crawl.page_size must be positive");
        ensure!(
            self.crawl.page_size <= self.source.max_page_size,
            "crawl.page_size {} exceeds source.max_page_size {}",
            self.crawl.page_size,
            self.source.max_page_size
        );
        ensure!(
            self.crawl.max_messages != Some(0),
            "crawl.max_messages must be positive when set"
        );
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("ARCHIVER").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}
