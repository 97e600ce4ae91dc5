use anyhow::ensure;
use channel_archiver::app::*;
use channel_archiver::application_impl::*;
use channel_archiver::domain_model::*;
use channel_archiver::logger::*;
use channel_archiver::settings::*;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap(std::io::stderr().is_terminal());

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let app = App::try_new(&project_settings).await?;

    let result = match cli.command {
        Command::Fetch(args) => fetch(&app, &project_settings, &args).await,
        Command::Daily(args) => daily(&app, &project_settings, &args).await,
        Command::Day(args) => day(&app, &project_settings, &args).await,
    };

    let shutdown_timeout = std::time::Duration::from_secs(30);
    match tokio::time::timeout(shutdown_timeout, app.shutdown()).await {
        Ok(()) => info!("archiver shut down"),
        Err(_) => error!("archiver shutdown timed out"),
    }
    result
}

fn channels_or_configured(channels: &[String], settings: &Settings) -> Vec<ChannelId> {
    let channels = if channels.is_empty() {
        &settings.crawl.channels
    } else {
        channels
    };
    channels.iter().cloned().map(ChannelId).collect()
}

async fn fetch(app: &App, settings: &Settings, args: &FetchArgs) -> anyhow::Result<()> {
    let plan = FetchPlan::from_settings(&settings.crawl).override_with(args);
    ensure!(
        !plan.channels.is_empty(),
        "no channels to fetch; set crawl.channels or pass --channel"
    );

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        warn!("graceful shutdown initiated, finishing the current page...");
                        cancel.cancel();
                    }
                    Err(e) => error!("could not register SIGINT handler: {e}"),
                },
                _ = cancel.cancelled() => {}
            }
        }
    });

    let outcomes = app.fetch(&plan, &cancel).await;
    cancel.cancel();
    let _ = interrupt.await;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => println!(
                "{}: {} message(s) in {} page(s), {}, next cursor {}",
                outcome.channel,
                report.progress.fetched,
                report.progress.pages,
                report.termination,
                report.progress.cursor
            ),
            Err(e) => {
                failed += 1;
                match e.resume_cursor() {
                    Some(cursor) => println!("{}: failed: {e}; resume from {cursor}", outcome.channel),
                    None => println!("{}: failed: {e}", outcome.channel),
                }
            }
        }
    }
    ensure!(failed == 0, "{failed} channel(s) ended abnormally");
    Ok(())
}

async fn daily(app: &App, settings: &Settings, args: &DailyArgs) -> anyhow::Result<()> {
    let mut reports = BTreeMap::new();
    for channel in channels_or_configured(&args.channels, settings) {
        let messages = app.store.list_channel(&channel).await?;
        let report = aggregate_daily(&messages);
        if report.skipped > 0 {
            warn!(%channel, skipped = report.skipped, "messages with unreadable timestamps skipped");
        }
        reports.insert(channel.0, report);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }
    for (channel, report) in &reports {
        println!("{channel}");
        for day in &report.days {
            println!(
                "Date: {}, Messages: {}, Active users: {}",
                day.date, day.messages, day.active_users
            );
        }
    }
    Ok(())
}

async fn day(app: &App, settings: &Settings, args: &DayArgs) -> anyhow::Result<()> {
    for channel in channels_or_configured(&args.channels, settings) {
        let messages = app.store.list_channel(&channel).await?;
        for message in messages_on(&messages, args.date) {
            println!(
                "User: {}, Message: {}, Date: {}",
                message.sender_id.as_deref().unwrap_or("unknown"),
                message.text,
                message.timestamp
            );
        }
    }
    Ok(())
}
