//! Console rendering of engine events.

use common::types::{ArbitrageOpportunity, Stats};
use detector::{EngineEvent, EngineHandle, OpportunityFilter, Page};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{info, warn};

pub struct ConsolePresenter {
    handle: EngineHandle,
    events: Receiver<EngineEvent>,
    filter: OpportunityFilter,
}

impl ConsolePresenter {
    pub fn new(handle: EngineHandle, filter: OpportunityFilter) -> Self {
        let events = handle.subscribe();
        Self {
            handle,
            events,
            filter,
        }
    }

    /// Renders events until the engine goes away.
    pub async fn run(mut self) {
        loop {
            match self.events.recv().await {
                Ok(event) => self.render(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Presenter lagged behind engine events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Presenter stopped");
    }

    async fn render(&self, event: EngineEvent) {
        match event {
            EngineEvent::Connectivity(true) => info!("Feed status: connected"),
            EngineEvent::Connectivity(false) => warn!("Feed status: disconnected"),
            EngineEvent::OpportunityRecorded(_) => {}
            EngineEvent::SignificantOpportunity(o) => {
                info!("Significant opportunity: {}", format_opportunity(&o));
            }
            EngineEvent::StatsUpdated(stats) | EngineEvent::LedgerReplaced(stats) => {
                info!("{}", format_stats(&stats));
                match self.handle.view(self.filter.clone(), 1).await {
                    Ok(page) => render_page(&page),
                    Err(e) => warn!(error = %e, "Could not fetch opportunity view"),
                }
            }
        }
    }
}

pub fn format_opportunity(o: &ArbitrageOpportunity) -> String {
    format!(
        "{} {} buy {} @ {} sell {} @ {} profit {}% net {}",
        o.detected_at.format("%H:%M:%S"),
        o.pair,
        o.buy_venue,
        o.buy_price,
        o.sell_venue,
        o.sell_price,
        o.profit_percentage.round_dp(2),
        o.net_profit.round_dp(4)
    )
}

pub fn format_stats(stats: &Stats) -> String {
    format!(
        "Opportunities: {} | Total profit: {} | Avg profit: {}%",
        stats.total_opportunities,
        stats.total_profit.round_dp(4),
        stats.average_profit_percentage.round_dp(2)
    )
}

fn render_page(page: &Page) {
    info!(
        "Page {}/{} ({} matching)",
        page.page, page.total_pages, page.total_items
    );
    for o in &page.items {
        info!("  {}", format_opportunity(o));
    }
}
