mod presenter;

use anyhow::Result;
use clap::Parser;
use config::{DataSource, EngineConfig};
use detector::{EngineService, OpportunityFilter};
use market_data_ingestor::{connector_from_config, FeedConnectionManager};
use presenter::{format_stats, ConsolePresenter};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line arguments for arb-monitor.
#[derive(Parser, Debug)]
struct Args {
    /// Path to the configuration YAML
    #[arg(long, env = "ARBITRAGE_CONFIG", default_value = "config/default.yml")]
    config: PathBuf,
    /// Websocket url, overriding the configured feed source
    #[arg(long, env = "ARBITRAGE_FEED_URL")]
    feed_url: Option<String>,
    /// Log level when RUST_LOG is unset (defaults to the configured level)
    #[arg(long, env = "ARBITRAGE_LOG_LEVEL")]
    log_level: Option<String>,
    /// Only display opportunities at or above this profit percentage
    #[arg(long, default_value = "0")]
    display_min_profit: Decimal,
    /// Only display pairs containing this text, or "all"
    #[arg(long, default_value = "all")]
    display_pair: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config: EngineConfig = config::load_config_from_path(&args.config).await?;
    if let Some(url) = args.feed_url.clone() {
        config.feed.source = DataSource::WebSocket { url };
    }
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level);
    config.validate()?;
    info!(config = %args.config.display(), source = ?config.feed.source, "Starting arb-monitor");

    // Feed -> engine channel
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();

    let (service, handle) = EngineService::new(&config, feed_rx);
    let presenter = ConsolePresenter::new(
        handle.clone(),
        OpportunityFilter::new(args.display_min_profit, &args.display_pair),
    );
    let engine_task = tokio::spawn(service.run());
    let presenter_task = tokio::spawn(presenter.run());

    let manager = FeedConnectionManager::new(
        connector_from_config(&config.feed.source),
        &config.feed,
        feed_tx,
    );
    let mut feed_state = manager.subscribe_state();
    tokio::spawn(async move {
        while feed_state.changed().await.is_ok() {
            let state = *feed_state.borrow_and_update();
            info!(%state, "Feed state changed");
        }
    });
    let (feed_shutdown_tx, feed_shutdown_rx) = oneshot::channel();
    let feed_task = tokio::spawn(manager.run(feed_shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    // Graceful shutdown: stop the feed first so no frame lands after the engine stops.
    feed_shutdown_tx.send(()).ok();
    match feed_task.await {
        Ok(Err(e)) => error!(error = %e, "Feed manager exited with error"),
        Err(e) => error!(error = %e, "Feed manager task panicked"),
        Ok(Ok(())) => {}
    }

    handle.shutdown().await;
    match engine_task.await {
        Ok(Ok(engine)) => info!("Final {}", format_stats(&engine.stats())),
        Ok(Err(e)) => error!(error = %e, "Engine exited with error"),
        Err(e) => error!(error = %e, "Engine task panicked"),
    }
    // The presenter holds a handle of its own, so its event stream never closes.
    presenter_task.abort();
    let _ = presenter_task.await;

    Ok(())
}
