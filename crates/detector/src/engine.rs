//! The synchronous engine core: market store, detector and ledger behind one owner.

use crate::ledger::OpportunityLedger;
use crate::market_state::{MarketState, PairSummary};
use crate::query::{self, OpportunityFilter, Page, QueryError};
use crate::strategies::{ArbitrageStrategy, CrossVenueArbitrage, ScanContext};
use common::messages::FeedMessage;
use common::types::{ArbitrageOpportunity, AssetPair, Quote, Stats, Venue};
use config_lib::DetectorConfig;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// What applying one message changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOutcome {
    /// Opportunities admitted to the ledger, in scan order.
    pub recorded: Vec<ArbitrageOpportunity>,
    /// The ledger was replaced wholesale.
    pub ledger_replaced: bool,
}

pub struct ArbEngine {
    market: MarketState,
    ledger: OpportunityLedger,
    active_venues: HashSet<Venue>,
    min_profit_pct: Decimal,
    taker_fees: HashMap<Venue, Decimal>,
    max_quote_skew: Option<chrono::Duration>,
    strategy: Box<dyn ArbitrageStrategy>,
}

impl ArbEngine {
    pub fn new(config: &DetectorConfig) -> Self {
        Self::with_strategy(config, Box::new(CrossVenueArbitrage::new()))
    }

    pub fn with_strategy(config: &DetectorConfig, strategy: Box<dyn ArbitrageStrategy>) -> Self {
        let max_quote_skew = config
            .max_quote_skew_ms
            .and_then(|ms| i64::try_from(ms).ok())
            .map(chrono::Duration::milliseconds);

        Self {
            market: MarketState::new(),
            ledger: OpportunityLedger::new(),
            active_venues: config.active_venues.iter().cloned().collect(),
            min_profit_pct: config.min_profit_pct,
            taker_fees: config.taker_fees.clone(),
            max_quote_skew,
            strategy,
        }
    }

    /// Stores `quote` and rescans its pair.
    pub fn apply_quote(&mut self, quote: Quote) -> Vec<ArbitrageOpportunity> {
        log::debug!(
            "Quote {} {}: bid {} ask {}",
            quote.venue,
            quote.pair,
            quote.bid,
            quote.ask
        );
        let pair = quote.pair.clone();
        self.market.apply_quote(quote);
        let found = self.scan_pair(&pair);
        self.record_all(found)
    }

    /// Replaces the market and rescans every pair.
    pub fn apply_snapshot(&mut self, quotes: Vec<Quote>) -> Vec<ArbitrageOpportunity> {
        log::debug!("Applying market snapshot of {} quotes", quotes.len());
        self.market.apply_snapshot(quotes);

        let mut pairs: Vec<AssetPair> = self.market.pairs().cloned().collect();
        pairs.sort();
        let found: Vec<ArbitrageOpportunity> =
            pairs.iter().flat_map(|pair| self.scan_pair(pair)).collect();
        self.record_all(found)
    }

    /// Records an opportunity reported by the upstream source.
    pub fn record_opportunity(
        &mut self,
        opportunity: ArbitrageOpportunity,
    ) -> Option<ArbitrageOpportunity> {
        if self.ledger.record(opportunity.clone()) {
            Some(opportunity)
        } else {
            log::debug!(
                "Duplicate opportunity {} {}->{} ignored",
                opportunity.pair,
                opportunity.buy_venue,
                opportunity.sell_venue
            );
            None
        }
    }

    pub fn replace_opportunities(&mut self, opportunities: Vec<ArbitrageOpportunity>) {
        log::debug!("Replacing ledger with {} opportunities", opportunities.len());
        self.ledger.replace_all(opportunities);
    }

    pub fn handle_message(&mut self, message: FeedMessage) -> MessageOutcome {
        match message {
            FeedMessage::Quote(quote) => MessageOutcome {
                recorded: self.apply_quote(quote),
                ledger_replaced: false,
            },
            FeedMessage::Market(quotes) => MessageOutcome {
                recorded: self.apply_snapshot(quotes),
                ledger_replaced: false,
            },
            FeedMessage::Opportunity(opportunity) => MessageOutcome {
                recorded: self.record_opportunity(opportunity).into_iter().collect(),
                ledger_replaced: false,
            },
            FeedMessage::Opportunities(opportunities) => {
                self.replace_opportunities(opportunities);
                MessageOutcome {
                    recorded: Vec::new(),
                    ledger_replaced: true,
                }
            }
        }
    }

    /// Runs detection for one pair without recording anything.
    pub fn scan_pair(&self, pair: &AssetPair) -> Vec<ArbitrageOpportunity> {
        let quotes = self.market.quotes_for_pair(pair);
        if quotes.len() < 2 {
            return Vec::new();
        }
        self.strategy
            .detect_opportunities(&quotes, &self.scan_context())
    }

    fn scan_context(&self) -> ScanContext<'_> {
        ScanContext {
            min_profit_pct: self.min_profit_pct,
            active_venues: &self.active_venues,
            taker_fees: &self.taker_fees,
            max_quote_skew: self.max_quote_skew,
        }
    }

    fn record_all(&mut self, found: Vec<ArbitrageOpportunity>) -> Vec<ArbitrageOpportunity> {
        found
            .into_iter()
            .filter(|opportunity| self.ledger.record(opportunity.clone()))
            .collect()
    }

    pub fn set_min_profit_pct(&mut self, min_profit_pct: Decimal) {
        log::info!(
            "Minimum profit threshold {}% -> {}%",
            self.min_profit_pct,
            min_profit_pct
        );
        self.min_profit_pct = min_profit_pct;
    }

    pub fn min_profit_pct(&self) -> Decimal {
        self.min_profit_pct
    }

    /// Returns `true` if the set changed.
    pub fn set_venue_active(&mut self, venue: Venue, active: bool) -> bool {
        let changed = if active {
            self.active_venues.insert(venue.clone())
        } else {
            self.active_venues.remove(&venue)
        };
        if changed {
            log::info!(
                "Venue {} {}",
                venue,
                if active { "enabled" } else { "disabled" }
            );
        }
        changed
    }

    /// Active venues, sorted.
    pub fn active_venues(&self) -> Vec<Venue> {
        let mut venues: Vec<Venue> = self.active_venues.iter().cloned().collect();
        venues.sort();
        venues
    }

    pub fn stats(&self) -> Stats {
        self.ledger.stats()
    }

    pub fn recent(&self, limit: usize) -> Vec<ArbitrageOpportunity> {
        self.ledger.recent(limit)
    }

    pub fn view(
        &self,
        criteria: &OpportunityFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page, QueryError> {
        query::paginate(query::filter(self.ledger.iter(), criteria), page, page_size)
    }

    /// Every stored quote, ordered by pair then venue.
    pub fn market(&self) -> Vec<Quote> {
        let mut quotes: Vec<Quote> = self.market.quotes().cloned().collect();
        quotes.sort_by(|a, b| (&a.pair, &a.venue).cmp(&(&b.pair, &b.venue)));
        quotes
    }

    pub fn market_summary(&self) -> Vec<PairSummary> {
        self.market.pair_summaries()
    }

    pub fn market_state(&self) -> &MarketState {
        &self.market
    }

    pub fn ledger(&self) -> &OpportunityLedger {
        &self.ledger
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn quote(venue: &str, pair: &str, bid: Decimal, ask: Decimal, sec: u32) -> Quote {
        Quote::new(
            venue,
            pair.parse().unwrap(),
            bid,
            ask,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap(),
        )
    }

    fn engine() -> ArbEngine {
        let config = DetectorConfig {
            active_venues: vec![Venue::from("A"), Venue::from("B"), Venue::from("C")],
            ..DetectorConfig::default()
        };
        ArbEngine::new(&config)
    }

    #[test]
    fn test_quote_triggers_scan_and_record() {
        let mut engine = engine();
        assert!(engine
            .apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0))
            .is_empty());

        let recorded = engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0));
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].profit_percentage, dec!(3));
        assert_eq!(engine.stats().total_opportunities, 1);
        assert_eq!(engine.strategy_name(), "cross_venue_arbitrage");
    }

    #[test]
    fn test_rescan_of_unchanged_quotes_is_deduplicated() {
        let mut engine = engine();
        engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
        engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0));

        // Same timestamps, so the same identity key comes out of the scan.
        let again = engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
        assert!(again.is_empty());
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn test_scan_is_scoped_to_pair() {
        let mut engine = engine();
        engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
        let recorded = engine.apply_quote(quote("B", "ETH/USDT", dec!(103), dec!(101), 0));
        assert!(recorded.is_empty());
    }

    #[test]
    fn test_disabled_venue_still_updates_market() {
        let mut engine = engine();
        assert!(engine.set_venue_active(Venue::from("B"), false));
        assert!(!engine.set_venue_active(Venue::from("B"), false));

        engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
        let recorded = engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0));

        assert!(recorded.is_empty());
        assert_eq!(engine.market().len(), 2);
        assert_eq!(engine.active_venues(), vec![Venue::from("A"), Venue::from("C")]);
    }

    #[test]
    fn test_threshold_change_applies_to_next_scan() {
        let mut engine = engine();
        engine.set_min_profit_pct(dec!(5));
        engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
        assert!(engine
            .apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0))
            .is_empty());

        engine.set_min_profit_pct(dec!(1));
        let recorded = engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 1));
        assert_eq!(recorded.len(), 1);
        assert_eq!(engine.min_profit_pct(), dec!(1));
    }

    #[test]
    fn test_snapshot_scans_all_pairs() {
        let mut engine = engine();
        let outcome = engine.handle_message(FeedMessage::Market(vec![
            quote("A", "BTC/USDT", dec!(99), dec!(100), 0),
            quote("B", "BTC/USDT", dec!(103), dec!(101), 0),
            quote("A", "ETH/USDT", dec!(9), dec!(10), 0),
            quote("C", "ETH/USDT", dec!(11), dec!(12), 0),
        ]));

        assert_eq!(outcome.recorded.len(), 2);
        assert!(!outcome.ledger_replaced);
        assert_eq!(outcome.recorded[0].pair.to_string(), "BTC/USDT");
        assert_eq!(engine.market_summary().len(), 2);
    }

    #[test]
    fn test_opportunity_messages() {
        let mut engine = engine();
        engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
        let recorded = engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0));
        let existing = recorded[0].clone();

        let outcome = engine.handle_message(FeedMessage::Opportunity(existing.clone()));
        assert!(outcome.recorded.is_empty());

        let outcome = engine.handle_message(FeedMessage::Opportunities(vec![
            existing.clone(),
            existing,
        ]));
        assert!(outcome.ledger_replaced);
        assert_eq!(engine.ledger().len(), 2);
    }

    #[test]
    fn test_view_filters_and_pages() {
        let mut engine = engine();
        engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
        engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0));

        let page = engine
            .view(&OpportunityFilter::new(dec!(1), "btc"), 1, 10)
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 1);

        let none = engine
            .view(&OpportunityFilter::new(dec!(1), "eth"), 1, 10)
            .unwrap();
        assert!(none.items.is_empty());
        assert!(engine.view(&OpportunityFilter::default(), 2, 10).is_err());
    }
}
