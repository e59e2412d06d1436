use common::messages::FeedMessage;
use common::types::{Asset, AssetPair};
use config_lib::FilterConfig;
use tracing::trace;

/// Filter criteria for selecting which pairs reach the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketFilter {
    /// All pairs.
    All,
    /// All pairs with this asset on either side.
    Asset(Asset),
    /// Specific pairs (unordered).
    Pairs(Vec<(Asset, Asset)>),
}

impl MarketFilter {
    /// Returns true if the given pair matches this filter.
    pub fn matches(&self, pair: &AssetPair) -> bool {
        match self {
            MarketFilter::All => true,
            MarketFilter::Asset(asset) => pair.involves(asset),
            MarketFilter::Pairs(pairs) => pairs.iter().any(|(a, b)| {
                (a == &pair.base && b == &pair.quote) || (a == &pair.quote && b == &pair.base)
            }),
        }
    }
}

impl From<&FilterConfig> for MarketFilter {
    fn from(cfg: &FilterConfig) -> Self {
        match cfg {
            FilterConfig::All => MarketFilter::All,
            FilterConfig::Asset { asset } => MarketFilter::Asset(Asset::from(asset.as_str())),
            FilterConfig::Pairs { pairs } => MarketFilter::Pairs(
                pairs
                    .iter()
                    .map(|(a, b)| (Asset::from(a.as_str()), Asset::from(b.as_str())))
                    .collect(),
            ),
        }
    }
}

/// A processing step that drops quotes for pairs outside the configured filter.
/// Opportunity messages pass through untouched.
pub struct FilterStep {
    filter: MarketFilter,
}

impl FilterStep {
    /// Create a new `FilterStep` from the shared configuration filter.
    pub fn new(cfg: &FilterConfig) -> Self {
        FilterStep {
            filter: MarketFilter::from(cfg),
        }
    }

    /// Returns `None` when nothing of the message survives. A snapshot always
    /// survives, possibly empty, since it still replaces the whole market.
    pub fn apply(&self, message: FeedMessage) -> Option<FeedMessage> {
        match message {
            FeedMessage::Quote(quote) => {
                if self.filter.matches(&quote.pair) {
                    Some(FeedMessage::Quote(quote))
                } else {
                    trace!(pair = %quote.pair, "Quote filtered out");
                    None
                }
            }
            FeedMessage::Market(quotes) => Some(FeedMessage::Market(
                quotes
                    .into_iter()
                    .filter(|q| self.filter.matches(&q.pair))
                    .collect(),
            )),
            other => Some(other),
        }
    }
}
