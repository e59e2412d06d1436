use crate::api::{Command, EngineEvent, EngineHandle};
use crate::engine::{ArbEngine, MessageOutcome};
use anyhow::Result;
use common::messages::FeedEvent;
use config_lib::EngineConfig;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver};
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Single owner of the engine core. Feed events and handle commands are
/// applied one at a time, so every scan sees a consistent market.
pub struct EngineService {
    engine: ArbEngine,
    /// Events pushed by the feed connection manager.
    feed_rx: UnboundedReceiver<FeedEvent>,
    command_rx: Receiver<Command>,
    shutdown_rx: Receiver<()>,
    events: broadcast::Sender<EngineEvent>,
    notify_profit_pct: Decimal,
    page_size: usize,
    summary_interval: Duration,
}

impl EngineService {
    /// Creates the service and the handle that controls it.
    pub fn new(
        config: &EngineConfig,
        feed_rx: UnboundedReceiver<FeedEvent>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let service = Self {
            engine: ArbEngine::new(&config.detector),
            feed_rx,
            command_rx,
            shutdown_rx,
            events: events.clone(),
            notify_profit_pct: config.detector.notify_profit_pct,
            page_size: config.presentation.page_size,
            summary_interval: config.detector.summary_interval(),
        };
        let handle = EngineHandle::new(command_tx, shutdown_tx, events);
        (service, handle)
    }

    /// Runs until shutdown is requested or every handle is dropped.
    /// Returns the final engine state.
    pub async fn run(mut self) -> Result<ArbEngine> {
        let mut summary = interval_at(
            Instant::now() + self.summary_interval,
            self.summary_interval,
        );
        summary.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut feed_open = true;

        log::info!(
            "EngineService started with strategy {}",
            self.engine.strategy_name()
        );

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    log::info!("EngineService shutting down.");
                    break;
                }
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command);
                }
                maybe_event = self.feed_rx.recv(), if feed_open => {
                    match maybe_event {
                        Some(event) => self.handle_feed_event(event),
                        None => {
                            log::info!("Feed channel closed; serving queries only");
                            feed_open = false;
                        }
                    }
                }
                _ = summary.tick() => {
                    self.log_market_summary();
                }
            }
        }

        Ok(self.engine)
    }

    fn handle_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connectivity(connected) => {
                if connected {
                    log::info!("Feed connected");
                } else {
                    log::warn!("Feed disconnected");
                }
                self.publish(EngineEvent::Connectivity(connected));
            }
            FeedEvent::Message(message) => {
                let kind = message.kind();
                let outcome = self.engine.handle_message(message);
                log::debug!(
                    "Applied {} message: {} new opportunities",
                    kind,
                    outcome.recorded.len()
                );
                self.publish_outcome(outcome);
            }
        }
    }

    fn publish_outcome(&self, outcome: MessageOutcome) {
        if outcome.ledger_replaced {
            self.publish(EngineEvent::LedgerReplaced(self.engine.stats()));
        }
        if outcome.recorded.is_empty() {
            return;
        }

        for opportunity in outcome.recorded {
            if opportunity.profit_percentage > self.notify_profit_pct {
                log::info!(
                    "Significant opportunity {}: buy {} @ {} sell {} @ {} ({}%)",
                    opportunity.pair,
                    opportunity.buy_venue,
                    opportunity.buy_price,
                    opportunity.sell_venue,
                    opportunity.sell_price,
                    opportunity.profit_percentage.round_dp(4)
                );
                self.publish(EngineEvent::OpportunityRecorded(opportunity.clone()));
                self.publish(EngineEvent::SignificantOpportunity(opportunity));
            } else {
                self.publish(EngineEvent::OpportunityRecorded(opportunity));
            }
        }
        self.publish(EngineEvent::StatsUpdated(self.engine.stats()));
    }

    fn handle_command(&mut self, command: Command) {
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::SetMinProfitPct { value, reply } => {
                self.engine.set_min_profit_pct(value);
                let _ = reply.send(());
            }
            Command::SetVenueActive {
                venue,
                active,
                reply,
            } => {
                let _ = reply.send(self.engine.set_venue_active(venue, active));
            }
            Command::ActiveVenues(reply) => {
                let _ = reply.send(self.engine.active_venues());
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.engine.stats());
            }
            Command::Recent { limit, reply } => {
                let _ = reply.send(self.engine.recent(limit));
            }
            Command::View {
                filter,
                page,
                reply,
            } => {
                let _ = reply.send(self.engine.view(&filter, page, self.page_size));
            }
            Command::Market(reply) => {
                let _ = reply.send(self.engine.market());
            }
            Command::MarketSummary(reply) => {
                let _ = reply.send(self.engine.market_summary());
            }
        }
    }

    fn publish(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn log_market_summary(&self) {
        let summaries = self.engine.market_summary();
        if summaries.is_empty() {
            return;
        }
        let stats = self.engine.stats();
        log::info!(
            "Market summary: {} pairs, {} quotes, {} opportunities (avg {}%)",
            summaries.len(),
            self.engine.market_state().len(),
            stats.total_opportunities,
            stats.average_profit_percentage.round_dp(4)
        );
        for summary in summaries {
            let spread = summary
                .spread_pct
                .map(|s| format!("{}%", s.round_dp(4)))
                .unwrap_or_else(|| "n/a".to_string());
            log::info!(
                "  {}: best bid {} @ {}, best ask {} @ {}, spread {} across {} venues",
                summary.pair,
                summary.best_bid.0,
                summary.best_bid.1,
                summary.best_ask.0,
                summary.best_ask.1,
                spread,
                summary.venue_count
            );
        }
    }
}
