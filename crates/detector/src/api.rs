//! Control handle and outbound events of the engine service.

use crate::market_state::PairSummary;
use crate::query::{OpportunityFilter, Page, QueryError};
use common::types::{ArbitrageOpportunity, Quote, Stats, Venue};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Events published to presentation consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The feed came up (`true`) or went down (`false`).
    Connectivity(bool),
    OpportunityRecorded(ArbitrageOpportunity),
    /// A newly recorded opportunity above the notification threshold.
    SignificantOpportunity(ArbitrageOpportunity),
    StatsUpdated(Stats),
    /// The ledger was hydrated wholesale.
    LedgerReplaced(Stats),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine service is not running")]
    Stopped,

    #[error(transparent)]
    Query(#[from] QueryError),
}

pub(crate) enum Command {
    SetMinProfitPct {
        value: Decimal,
        reply: oneshot::Sender<()>,
    },
    SetVenueActive {
        venue: Venue,
        active: bool,
        reply: oneshot::Sender<bool>,
    },
    ActiveVenues(oneshot::Sender<Vec<Venue>>),
    Stats(oneshot::Sender<Stats>),
    Recent {
        limit: usize,
        reply: oneshot::Sender<Vec<ArbitrageOpportunity>>,
    },
    View {
        filter: OpportunityFilter,
        page: usize,
        reply: oneshot::Sender<Result<Page, QueryError>>,
    },
    Market(oneshot::Sender<Vec<Quote>>),
    MarketSummary(oneshot::Sender<Vec<PairSummary>>),
}

/// Cloneable handle to a running `EngineService`.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    shutdown: mpsc::Sender<()>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        shutdown: mpsc::Sender<()>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            commands,
            shutdown,
            events,
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)
    }

    /// Takes effect from the next scan.
    pub async fn set_min_profit_pct(&self, value: Decimal) -> Result<(), EngineError> {
        self.request(|reply| Command::SetMinProfitPct { value, reply })
            .await
    }

    /// Returns `true` if the active set changed.
    pub async fn set_venue_active(
        &self,
        venue: impl Into<Venue>,
        active: bool,
    ) -> Result<bool, EngineError> {
        let venue = venue.into();
        self.request(|reply| Command::SetVenueActive {
            venue,
            active,
            reply,
        })
        .await
    }

    pub async fn active_venues(&self) -> Result<Vec<Venue>, EngineError> {
        self.request(Command::ActiveVenues).await
    }

    pub async fn stats(&self) -> Result<Stats, EngineError> {
        self.request(Command::Stats).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<ArbitrageOpportunity>, EngineError> {
        self.request(|reply| Command::Recent { limit, reply }).await
    }

    /// One page of the filtered ledger, using the configured page size.
    pub async fn view(&self, filter: OpportunityFilter, page: usize) -> Result<Page, EngineError> {
        let result = self
            .request(|reply| Command::View {
                filter,
                page,
                reply,
            })
            .await?;
        Ok(result?)
    }

    pub async fn market(&self) -> Result<Vec<Quote>, EngineError> {
        self.request(Command::Market).await
    }

    pub async fn market_summary(&self) -> Result<Vec<PairSummary>, EngineError> {
        self.request(Command::MarketSummary).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Asks the service to stop. Succeeds if it is already gone.
    pub async fn shutdown(&self) {
        if self.shutdown.send(()).await.is_err() {
            log::debug!("Engine service already stopped");
        }
    }
}
