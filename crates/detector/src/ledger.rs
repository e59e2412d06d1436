use common::types::{ArbitrageOpportunity, OpportunityKey, Stats};
use rust_decimal::Decimal;
use std::collections::{HashSet, VecDeque};

/// Maximum number of opportunities the ledger retains.
pub const LEDGER_CAPACITY: usize = 100;

/// Bounded, newest-first history of opportunities, deduplicated by identity key.
#[derive(Debug, Clone)]
pub struct OpportunityLedger {
    entries: VecDeque<ArbitrageOpportunity>,
    seen: HashSet<OpportunityKey>,
    capacity: usize,
}

impl Default for OpportunityLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl OpportunityLedger {
    pub fn new() -> Self {
        Self::with_capacity(LEDGER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends `opportunity` unless its key is already held.
    /// Returns `true` if the opportunity was admitted.
    pub fn record(&mut self, opportunity: ArbitrageOpportunity) -> bool {
        let key = opportunity.key();
        if self.seen.contains(&key) {
            return false;
        }

        self.seen.insert(key);
        self.entries.push_front(opportunity);
        self.evict_overflow();
        true
    }

    /// Replaces the whole history. Entries are ordered newest-first (stable for
    /// equal timestamps) and truncated to capacity; duplicates are kept.
    pub fn replace_all(&mut self, mut opportunities: Vec<ArbitrageOpportunity>) {
        opportunities.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        opportunities.truncate(self.capacity);

        self.seen = opportunities.iter().map(ArbitrageOpportunity::key).collect();
        self.entries = opportunities.into();
    }

    fn evict_overflow(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                let key = evicted.key();
                // A hydrated ledger may hold the same key twice.
                if !self.entries.iter().any(|o| o.key() == key) {
                    self.seen.remove(&key);
                }
            }
        }
    }

    pub fn stats(&self) -> Stats {
        let total_opportunities = self.entries.len();
        if total_opportunities == 0 {
            return Stats::default();
        }

        // Hydrated entries are unvalidated, so the totals saturate.
        let (total_profit, total_pct) = self.entries.iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(profit, pct), o| {
                (
                    profit.saturating_add(o.net_profit),
                    pct.saturating_add(o.profit_percentage),
                )
            },
        );
        let average_profit_percentage = total_pct
            .checked_div(Decimal::from(total_opportunities))
            .unwrap_or(Decimal::ZERO);

        Stats {
            total_opportunities,
            total_profit,
            average_profit_percentage,
        }
    }

    /// The newest `limit` entries.
    pub fn recent(&self, limit: usize) -> Vec<ArbitrageOpportunity> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArbitrageOpportunity> {
        self.entries.iter()
    }

    pub fn contains(&self, key: &OpportunityKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use common::types::Venue;
    use rust_decimal_macros::dec;

    fn opportunity(sec: i64, profit_pct: Decimal, net: Decimal) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            detected_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::seconds(sec),
            pair: "BTC/USDT".parse().unwrap(),
            buy_venue: Venue::from("Binance"),
            sell_venue: Venue::from("Kraken"),
            buy_price: dec!(100),
            sell_price: dec!(100) + net,
            profit_percentage: profit_pct,
            net_profit: net,
        }
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let ledger = OpportunityLedger::new();
        let stats = ledger.stats();
        assert_eq!(stats.total_opportunities, 0);
        assert_eq!(stats.total_profit, Decimal::ZERO);
        assert_eq!(stats.average_profit_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_record_is_newest_first() {
        let mut ledger = OpportunityLedger::new();
        assert!(ledger.record(opportunity(1, dec!(1), dec!(1))));
        assert!(ledger.record(opportunity(2, dec!(2), dec!(2))));

        let recent = ledger.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].net_profit, dec!(2));
        assert_eq!(ledger.recent(1).len(), 1);
    }

    #[test]
    fn test_duplicate_key_is_absorbed() {
        let mut ledger = OpportunityLedger::new();
        let first = opportunity(1, dec!(1), dec!(1));
        // Same identity key, different prices.
        let mut repeat = first.clone();
        repeat.net_profit = dec!(5);

        assert!(ledger.record(first));
        assert!(!ledger.record(repeat));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.recent(1)[0].net_profit, dec!(1));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut ledger = OpportunityLedger::new();
        for sec in 0..150 {
            ledger.record(opportunity(sec, dec!(1), dec!(1)));
        }

        assert_eq!(ledger.len(), LEDGER_CAPACITY);
        let recent = ledger.recent(LEDGER_CAPACITY);
        assert_eq!(recent[0].detected_at, opportunity(149, dec!(1), dec!(1)).detected_at);
        assert_eq!(recent[99].detected_at, opportunity(50, dec!(1), dec!(1)).detected_at);

        // An evicted key can be admitted again.
        assert!(!ledger.contains(&opportunity(0, dec!(1), dec!(1)).key()));
        assert!(ledger.record(opportunity(0, dec!(1), dec!(1))));
    }

    #[test]
    fn test_stats_fold() {
        let mut ledger = OpportunityLedger::new();
        ledger.record(opportunity(1, dec!(1), dec!(2)));
        ledger.record(opportunity(2, dec!(3), dec!(4)));

        let stats = ledger.stats();
        assert_eq!(stats.total_opportunities, 2);
        assert_eq!(stats.total_profit, dec!(6));
        assert_eq!(stats.average_profit_percentage, dec!(2));
    }

    #[test]
    fn test_stats_saturate_on_extreme_values() {
        let mut ledger = OpportunityLedger::new();
        let mut high = opportunity(1, Decimal::MAX, dec!(0));
        high.net_profit = Decimal::MAX;
        let mut higher = opportunity(2, Decimal::MAX, dec!(0));
        higher.net_profit = Decimal::MAX;
        ledger.replace_all(vec![high, higher]);

        let stats = ledger.stats();
        assert_eq!(stats.total_opportunities, 2);
        assert_eq!(stats.total_profit, Decimal::MAX);
        assert!(stats.average_profit_percentage > Decimal::ZERO);

        let mut low = opportunity(3, Decimal::MIN, dec!(0));
        low.net_profit = Decimal::MIN;
        ledger.replace_all(vec![low.clone(), low]);
        assert_eq!(ledger.stats().total_profit, Decimal::MIN);
    }

    #[test]
    fn test_replace_all_sorts_and_truncates() {
        let mut ledger = OpportunityLedger::new();
        ledger.record(opportunity(500, dec!(9), dec!(9)));

        let incoming: Vec<_> = (0..120).map(|s| opportunity(s, dec!(1), dec!(1))).collect();
        ledger.replace_all(incoming);

        assert_eq!(ledger.len(), LEDGER_CAPACITY);
        let recent = ledger.recent(1);
        assert_eq!(recent[0].detected_at, opportunity(119, dec!(1), dec!(1)).detected_at);
        assert!(!ledger.contains(&opportunity(500, dec!(9), dec!(9)).key()));
    }

    #[test]
    fn test_replace_all_keeps_duplicates() {
        let mut ledger = OpportunityLedger::new();
        let o = opportunity(1, dec!(1), dec!(1));
        ledger.replace_all(vec![o.clone(), o.clone()]);
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.record(o));
    }
}
