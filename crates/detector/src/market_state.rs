//! Last-write-wins store of the latest quote per (venue, pair).

use common::types::{AssetPair, Quote, Venue};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Best prices across every venue quoting one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSummary {
    pub pair: AssetPair,
    pub venue_count: usize,
    pub best_bid: (Venue, Decimal),
    pub best_ask: (Venue, Decimal),
    /// `(best_bid - best_ask) / best_ask * 100`; `None` when the best ask is not positive.
    pub spread_pct: Option<Decimal>,
}

/// The market store. Quotes are grouped by pair so a scan can fetch every
/// venue quoting a pair without walking the whole market.
#[derive(Debug, Clone, Default)]
pub struct MarketState {
    pairs: HashMap<AssetPair, BTreeMap<Venue, Quote>>,
}

impl MarketState {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the entry for `(quote.venue, quote.pair)`.
    pub fn apply_quote(&mut self, quote: Quote) {
        self.pairs
            .entry(quote.pair.clone())
            .or_default()
            .insert(quote.venue.clone(), quote);
    }

    /// Replaces the whole store with `quotes`. Later entries win on duplicate keys.
    pub fn apply_snapshot(&mut self, quotes: impl IntoIterator<Item = Quote>) {
        let mut next = MarketState::new();
        for quote in quotes {
            next.apply_quote(quote);
        }
        *self = next;
    }

    pub fn get(&self, venue: &Venue, pair: &AssetPair) -> Option<&Quote> {
        self.pairs.get(pair).and_then(|venues| venues.get(venue))
    }

    /// Venues currently quoting `pair`.
    pub fn venues_for_pair(&self, pair: &AssetPair) -> Vec<&Venue> {
        self.pairs
            .get(pair)
            .map(|venues| venues.keys().collect())
            .unwrap_or_default()
    }

    /// Latest quote of every venue quoting `pair`.
    pub fn quotes_for_pair(&self, pair: &AssetPair) -> Vec<&Quote> {
        self.pairs
            .get(pair)
            .map(|venues| venues.values().collect())
            .unwrap_or_default()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &AssetPair> {
        self.pairs.keys()
    }

    /// Every stored quote.
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.pairs.values().flat_map(|venues| venues.values())
    }

    pub fn len(&self) -> usize {
        self.pairs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pair_summary(&self, pair: &AssetPair) -> Option<PairSummary> {
        let venues = self.pairs.get(pair)?;
        let best_bid = venues.values().max_by(|a, b| a.bid.cmp(&b.bid))?;
        let best_ask = venues.values().min_by(|a, b| a.ask.cmp(&b.ask))?;
        let spread_pct = if best_ask.ask > Decimal::ZERO {
            best_bid
                .bid
                .checked_sub(best_ask.ask)
                .and_then(|d| d.checked_div(best_ask.ask))
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        } else {
            None
        };
        Some(PairSummary {
            pair: pair.clone(),
            venue_count: venues.len(),
            best_bid: (best_bid.venue.clone(), best_bid.bid),
            best_ask: (best_ask.venue.clone(), best_ask.ask),
            spread_pct,
        })
    }

    /// Summaries for every pair, ordered by pair.
    pub fn pair_summaries(&self) -> Vec<PairSummary> {
        let mut pairs: Vec<&AssetPair> = self.pairs.keys().collect();
        pairs.sort();
        pairs
            .into_iter()
            .filter_map(|pair| self.pair_summary(pair))
            .collect()
    }
}
