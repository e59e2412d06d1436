//! Integration tests for the detector crate.

use chrono::{TimeZone, Utc};
use common::messages::FeedMessage;
use common::types::{Quote, Venue};
use config_lib::DetectorConfig;
use detector::{ArbEngine, OpportunityFilter, QueryError, LEDGER_CAPACITY};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn quote(venue: &str, pair: &str, bid: Decimal, ask: Decimal, sec: u32) -> Quote {
    Quote::new(
        venue,
        pair.parse().unwrap(),
        bid,
        ask,
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(sec as i64),
    )
}

fn engine(venues: &[&str]) -> ArbEngine {
    let config = DetectorConfig {
        active_venues: venues.iter().map(|v| Venue::from(*v)).collect(),
        ..DetectorConfig::default()
    };
    ArbEngine::new(&config)
}

#[test]
fn test_market_reflects_latest_quote_per_key() {
    let mut engine = engine(&["A", "B"]);
    for (sec, bid) in [(0, dec!(10)), (1, dec!(12)), (2, dec!(11))] {
        engine.apply_quote(quote("A", "BTC/USDT", bid, bid + dec!(1), sec));
    }
    engine.apply_quote(quote("B", "BTC/USDT", dec!(5), dec!(6), 0));

    let market = engine.market();
    assert_eq!(market.len(), 2);
    let a = market.iter().find(|q| q.venue == Venue::from("A")).unwrap();
    assert_eq!(a.bid, dec!(11));
    assert_eq!(a.ask, dec!(12));
}

#[test]
fn test_reference_crossing() {
    let mut engine = engine(&["A", "B"]);
    engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
    engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0));

    let recent = engine.recent(10);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].buy_venue, Venue::from("A"));
    assert_eq!(recent[0].sell_venue, Venue::from("B"));
    assert_eq!(recent[0].profit_percentage, dec!(3));
    assert_eq!(recent[0].net_profit, dec!(3));
}

#[test]
fn test_ledger_bounded_under_load() {
    let mut engine = engine(&["A", "B"]);
    engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
    for sec in 0..250 {
        engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(104), sec));
    }

    let stats = engine.stats();
    assert_eq!(stats.total_opportunities, LEDGER_CAPACITY);
    assert_eq!(stats.total_profit, dec!(300));
    assert_eq!(
        engine.recent(1)[0].detected_at,
        quote("B", "BTC/USDT", dec!(0), dec!(0), 249).observed_at
    );
}

#[test]
fn test_duplicate_delivery_is_idempotent() {
    let mut engine = engine(&["A", "B"]);
    engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
    let recorded = engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 0));

    let outcome = engine.handle_message(FeedMessage::Opportunity(recorded[0].clone()));
    assert!(outcome.recorded.is_empty());
    assert_eq!(engine.stats().total_opportunities, 1);
}

#[test]
fn test_empty_engine_stats_and_view() {
    let engine = engine(&["A", "B"]);
    let stats = engine.stats();
    assert_eq!(stats.total_opportunities, 0);
    assert_eq!(stats.total_profit, Decimal::ZERO);
    assert_eq!(stats.average_profit_percentage, Decimal::ZERO);

    let page = engine.view(&OpportunityFilter::default(), 1, 10).unwrap();
    assert_eq!(page.total_pages, 1);
    assert!(page.items.is_empty());
}

#[test]
fn test_pagination_over_ledger() {
    let mut engine = engine(&["A", "B"]);
    engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
    for sec in 0..23 {
        engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(104), sec));
    }

    let criteria = OpportunityFilter::new(dec!(0), "usdt");
    assert_eq!(engine.view(&criteria, 1, 10).unwrap().total_pages, 3);
    assert_eq!(engine.view(&criteria, 3, 10).unwrap().items.len(), 3);
    assert_eq!(
        engine.view(&criteria, 4, 10),
        Err(QueryError::PageOutOfRange {
            page: 4,
            total_pages: 3
        })
    );
}

#[test]
fn test_disabling_venue_suppresses_future_opportunities() {
    let mut engine = engine(&["A", "B", "C"]);
    engine.apply_quote(quote("A", "BTC/USDT", dec!(99), dec!(100), 0));
    engine.set_venue_active(Venue::from("B"), false);

    engine.apply_quote(quote("B", "BTC/USDT", dec!(103), dec!(101), 1));
    engine.apply_quote(quote("C", "BTC/USDT", dec!(102), dec!(102.5), 2));

    let recent = engine.recent(10);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].sell_venue, Venue::from("C"));
    assert!(recent
        .iter()
        .all(|o| o.buy_venue != Venue::from("B") && o.sell_venue != Venue::from("B")));

    // Quotes for the disabled venue still land in the market.
    let b = engine
        .market_state()
        .get(&Venue::from("B"), &"BTC/USDT".parse().unwrap())
        .unwrap();
    assert_eq!(b.bid, dec!(103));
}

#[test]
fn test_crossed_quotes_do_not_crash() {
    let mut engine = engine(&["A", "B"]);
    // Inverted book on A, zero ask on B.
    engine.apply_quote(quote("A", "BTC/USDT", dec!(150), dec!(50), 0));
    let recorded = engine.apply_quote(quote("B", "BTC/USDT", dec!(0), dec!(0), 0));
    assert!(recorded.is_empty());

    let recorded = engine.apply_quote(quote("B", "BTC/USDT", dec!(60), dec!(70), 1));
    // Buy A at 50, sell B at 60 and buy B at 70, sell A at 150.
    assert_eq!(recorded.len(), 2);
}
