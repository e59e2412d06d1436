use super::{ArbitrageStrategy, ScanContext};
use common::types::{ArbitrageOpportunity, Quote};
use rust_decimal::Decimal;

/// Buy at one venue's ask, sell at another venue's bid.
///
/// Every unordered venue pair is evaluated in both directions, so one pair of
/// venues can produce zero, one or two opportunities per scan. Emission order
/// follows the scan: outer venue index, inner venue index, then the
/// buy-outer/sell-inner direction before its reverse.
#[derive(Debug, Clone, Default)]
pub struct CrossVenueArbitrage;

impl CrossVenueArbitrage {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates a single direction. Returns `None` for anything that is not a
    /// profitable, computable crossing between two active venues.
    fn evaluate(
        &self,
        buy: &Quote,
        sell: &Quote,
        ctx: &ScanContext<'_>,
    ) -> Option<ArbitrageOpportunity> {
        if !ctx.is_active(&buy.venue) || !ctx.is_active(&sell.venue) {
            return None;
        }

        if buy.ask <= Decimal::ZERO {
            log::debug!(
                "Skipping {} buy leg on {}: non-positive ask {}",
                buy.pair,
                buy.venue,
                buy.ask
            );
            return None;
        }

        if let Some(max_skew) = ctx.max_quote_skew {
            let skew = (buy.observed_at - sell.observed_at).abs();
            if skew > max_skew {
                log::debug!(
                    "Skipping {} {}->{}: legs observed {}ms apart",
                    buy.pair,
                    buy.venue,
                    sell.venue,
                    skew.num_milliseconds()
                );
                return None;
            }
        }

        let effective_buy = buy
            .ask
            .checked_mul(Decimal::ONE.checked_add(ctx.fee(&buy.venue))?)?;
        let effective_sell = sell
            .bid
            .checked_mul(Decimal::ONE.checked_sub(ctx.fee(&sell.venue))?)?;
        if effective_buy <= Decimal::ZERO {
            return None;
        }

        let net_profit = effective_sell.checked_sub(effective_buy)?;
        let profit_pct = net_profit
            .checked_div(effective_buy)?
            .checked_mul(Decimal::ONE_HUNDRED)?;

        if profit_pct <= ctx.min_profit_pct {
            return None;
        }

        Some(ArbitrageOpportunity {
            detected_at: buy.observed_at.max(sell.observed_at),
            pair: buy.pair.clone(),
            buy_venue: buy.venue.clone(),
            sell_venue: sell.venue.clone(),
            buy_price: buy.ask,
            sell_price: sell.bid,
            profit_percentage: profit_pct,
            net_profit,
        })
    }
}

impl ArbitrageStrategy for CrossVenueArbitrage {
    fn name(&self) -> &str {
        "cross_venue_arbitrage"
    }

    fn detect_opportunities(
        &self,
        quotes: &[&Quote],
        ctx: &ScanContext<'_>,
    ) -> Vec<ArbitrageOpportunity> {
        let mut opportunities = Vec::new();

        for (i, first) in quotes.iter().enumerate() {
            for second in &quotes[i + 1..] {
                if first.venue == second.venue {
                    continue;
                }
                if let Some(opportunity) = self.evaluate(first, second, ctx) {
                    opportunities.push(opportunity);
                }
                if let Some(opportunity) = self.evaluate(second, first, ctx) {
                    opportunities.push(opportunity);
                }
            }
        }

        opportunities
    }
}
