use crate::errors::CommonError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents a financial asset, identified by a symbol string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Asset(pub String);

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Asset {
    fn from(s: &str) -> Self {
        Asset(s.trim().to_uppercase())
    }
}

impl From<String> for Asset {
    fn from(s: String) -> Self {
        Asset::from(s.as_str())
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        asset.0
    }
}

/// Represents a pair of assets for trading, written `BASE/QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetPair {
    /// The base asset of the pair.
    pub base: Asset,
    /// The quote asset of the pair.
    pub quote: Asset,
}

impl AssetPair {
    /// Creates a new asset pair.
    pub fn new(base: Asset, quote: Asset) -> Self {
        AssetPair { base, quote }
    }

    /// Returns true if either side of the pair is `asset`.
    pub fn involves(&self, asset: &Asset) -> bool {
        &self.base == asset || &self.quote == asset
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for AssetPair {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| CommonError::ParseError(format!("pair '{}' is not BASE/QUOTE", s)))?;
        let (base, quote) = (base.trim(), quote.trim());
        if base.is_empty() || quote.is_empty() {
            return Err(CommonError::ParseError(format!(
                "pair '{}' has an empty side",
                s
            )));
        }
        Ok(AssetPair::new(Asset::from(base), Asset::from(quote)))
    }
}

impl TryFrom<String> for AssetPair {
    type Error = CommonError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AssetPair> for String {
    fn from(pair: AssetPair) -> Self {
        pair.to_string()
    }
}

/// Represents a unique identifier for a trading venue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Venue(pub String);

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Venue {
    fn from(s: &str) -> Self {
        Venue(s.to_string())
    }
}

/// A venue's best bid and ask for one pair at a point in time.
///
/// `bid <= ask` is expected but not enforced; crossed quotes flow through
/// the detector untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(alias = "exchange")]
    pub venue: Venue,
    #[serde(alias = "symbol", alias = "tradingPair", alias = "trading_pair")]
    pub pair: AssetPair,
    pub bid: Decimal,
    pub ask: Decimal,
    #[serde(alias = "observedAt", alias = "last_update", alias = "lastUpdate")]
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(
        venue: impl Into<Venue>,
        pair: AssetPair,
        bid: Decimal,
        ask: Decimal,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            venue: venue.into(),
            pair,
            bid,
            ask,
            observed_at,
        }
    }
}

/// Identity used to deduplicate opportunities in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpportunityKey {
    pub detected_at: DateTime<Utc>,
    pub buy_venue: Venue,
    pub sell_venue: Venue,
    pub pair: AssetPair,
}

/// A buy-on-one-venue, sell-on-another crossing that cleared the profit threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    #[serde(alias = "detectedAt", alias = "timestamp")]
    pub detected_at: DateTime<Utc>,
    #[serde(alias = "tradingPair", alias = "trading_pair")]
    pub pair: AssetPair,
    #[serde(alias = "buyVenue", alias = "buy_exchange", alias = "buyExchange")]
    pub buy_venue: Venue,
    #[serde(alias = "sellVenue", alias = "sell_exchange", alias = "sellExchange")]
    pub sell_venue: Venue,
    #[serde(alias = "buyPrice")]
    pub buy_price: Decimal,
    #[serde(alias = "sellPrice")]
    pub sell_price: Decimal,
    /// Profit in percent of the effective buy price.
    #[serde(alias = "profitPercentage")]
    pub profit_percentage: Decimal,
    /// Profit for a unit trade size.
    #[serde(alias = "netProfit")]
    pub net_profit: Decimal,
}

impl ArbitrageOpportunity {
    pub fn key(&self) -> OpportunityKey {
        OpportunityKey {
            detected_at: self.detected_at,
            buy_venue: self.buy_venue.clone(),
            sell_venue: self.sell_venue.clone(),
            pair: self.pair.clone(),
        }
    }
}

/// Aggregates over the current ledger contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Stats {
    pub total_opportunities: usize,
    pub total_profit: Decimal,
    pub average_profit_percentage: Decimal,
}
