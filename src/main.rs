// src/main.rs
use clap::Parser;
use ct_tail::cli::Cli;
use ct_tail::config::Config;
use ct_tail::ct_log::{HttpClientFactory, LogListFetcher, MonitorExit, MonitorSupervisor};
use ct_tail::output::OutputManager;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.validate()?;

    let mut config = match cli.config {
        Some(ref path) => Config::from_file(Path::new(path))?,
        None => Config::default(),
    };

    // CLI flags win over the file
    cli.apply_to(&mut config);
    config.validate()?;

    let log_level = cli.log_level().unwrap_or(&config.logging.level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Records own stdout
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting ct-tail...");

    let timeout = config.monitor.request_timeout();
    let fetcher = LogListFetcher::new(timeout)?;
    let sources = fetcher.resolve_sources(&config.log_list).await?;
    for source in &sources {
        tracing::info!("Monitoring {} ({})", source.name(), source.url);
    }

    let output = OutputManager::from_config(&config.output)?;
    tracing::debug!("{} output handler(s) ready", output.handler_count());

    let supervisor = MonitorSupervisor::start(
        sources,
        Arc::new(HttpClientFactory::new(timeout)),
        config.monitor.monitor_config(),
        config.monitor.channel_capacity,
    )?;

    let trigger = supervisor.shutdown_trigger();
    let requested = trigger.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl+C, shutting down...");
                trigger.trigger();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let report = supervisor.run(output).await;

    if !requested.is_triggered() {
        tracing::warn!("Every monitor stopped without a shutdown request");
    }

    for monitor in &report.monitors {
        match monitor.exit {
            MonitorExit::Failed(ref e) => {
                tracing::warn!("{}: never started: {}", monitor.source.name(), e)
            }
            _ => tracing::info!(
                "{}: stopped at index {} ({} records, {} skipped)",
                monitor.source.name(),
                monitor.cursor.unwrap_or_default(),
                monitor.stats.emitted,
                monitor.stats.skipped
            ),
        }
        if let Some(ref error) = monitor.last_error {
            tracing::warn!(
                "{}: {} consecutive poll failures, last: {}",
                monitor.source.name(),
                monitor.consecutive_failures,
                error
            );
        }
    }

    tracing::info!(
        "Stopped: {} of {} monitors started, {} records emitted",
        report.started(),
        report.monitors.len() + report.panicked,
        report.records_emitted
    );

    if report.started() == 0 {
        anyhow::bail!("No CT log monitor could be started");
    }

    Ok(())
}
