use super::Parser;
use chrono::NaiveDate;
use clap::{Args, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "channel-archiver", version, about = "Archive channel history and report daily activity")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch channel history into the configured store
    Fetch(FetchArgs),
    /// Print daily message volume and active users from the store
    Daily(DailyArgs),
    /// Print the stored messages of a single day
    Day(DayArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Channel to fetch; repeat for several. Defaults to `crawl.channels`.
    #[arg(long = "channel")]
    pub channels: Vec<String>,
    #[arg(long)]
    pub max_messages: Option<u64>,
    /// Resume below this message id instead of starting from the newest.
    #[arg(long)]
    pub before_id: Option<i64>,
    #[arg(long)]
    pub page_size: Option<u16>,
}

#[derive(Args, Debug)]
pub struct DailyArgs {
    #[arg(long = "channel")]
    pub channels: Vec<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DayArgs {
    /// Day to print, as YYYY-MM-DD
    pub date: NaiveDate,
    #[arg(long = "channel")]
    pub channels: Vec<String>,
}
