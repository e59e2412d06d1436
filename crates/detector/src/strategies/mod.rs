use common::types::{ArbitrageOpportunity, Quote, Venue};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

pub mod cross_venue;

pub use cross_venue::CrossVenueArbitrage;

/// Engine state a strategy reads on every scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// Minimum profit, in percent, a crossing must exceed.
    pub min_profit_pct: Decimal,
    pub active_venues: &'a HashSet<Venue>,
    /// Taker fee fraction per venue; missing venues trade fee-free.
    pub taker_fees: &'a HashMap<Venue, Decimal>,
    pub max_quote_skew: Option<chrono::Duration>,
}

impl ScanContext<'_> {
    pub fn is_active(&self, venue: &Venue) -> bool {
        self.active_venues.contains(venue)
    }

    pub fn fee(&self, venue: &Venue) -> Decimal {
        self.taker_fees.get(venue).copied().unwrap_or(Decimal::ZERO)
    }
}

pub trait ArbitrageStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Scans the latest quotes of every venue quoting a single pair.
    fn detect_opportunities(
        &self,
        quotes: &[&Quote],
        ctx: &ScanContext<'_>,
    ) -> Vec<ArbitrageOpportunity>;
}
