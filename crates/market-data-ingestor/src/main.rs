//! Connects to the configured feed and logs every decoded event. Useful for
//! checking a feed or a replay file without running the engine.

use anyhow::Result;
use clap::Parser;
use common::messages::{FeedEvent, FeedMessage};
use config_lib::{DataSource, EngineConfig};
use market_data_ingestor::{connector_from_config, FeedConnectionManager};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "feed-tap")]
struct Args {
    /// Path to the configuration YAML
    #[arg(long, env = "ARBITRAGE_CONFIG", default_value = "config/default.yml")]
    config: PathBuf,
    /// Websocket url, overriding the configured source
    #[arg(long, env = "ARBITRAGE_FEED_URL")]
    feed_url: Option<String>,
}

fn describe(message: &FeedMessage) -> String {
    match message {
        FeedMessage::Quote(q) => format!("{} {} bid={} ask={}", q.venue, q.pair, q.bid, q.ask),
        FeedMessage::Market(quotes) => format!("{} quotes", quotes.len()),
        FeedMessage::Opportunity(o) => format!(
            "{} {}->{} {}%",
            o.pair, o.buy_venue, o.sell_venue, o.profit_percentage
        ),
        FeedMessage::Opportunities(list) => format!("{} opportunities", list.len()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut config: EngineConfig = config_lib::load_config_from_path(&args.config).await?;
    if let Some(url) = args.feed_url {
        config.feed.source = DataSource::WebSocket { url };
    }
    config.validate()?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let manager = FeedConnectionManager::new(
        connector_from_config(&config.feed.source),
        &config.feed,
        tx,
    );
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let manager_handle = tokio::spawn(manager.run(shutdown_rx));

    let printer = tokio::spawn(async move {
        let mut frames = 0u64;
        while let Some(event) = rx.recv().await {
            match event {
                FeedEvent::Connectivity(up) => info!(connected = up, "Connectivity changed"),
                FeedEvent::Message(message) => {
                    frames += 1;
                    info!(kind = message.kind(), frames, "{}", describe(&message));
                }
            }
        }
        frames
    });

    tokio::signal::ctrl_c().await?;
    shutdown_tx.send(()).ok();

    match manager_handle.await {
        Ok(Err(e)) => error!(error = %e, "Feed manager exited with error"),
        Err(e) => error!(error = %e, "Feed manager task panicked"),
        Ok(Ok(())) => {}
    }
    let frames = printer.await.unwrap_or_default();
    info!(frames, "feed-tap finished");
    Ok(())
}
