//! Messages crossing the boundary between the feed and the engine.

use crate::types::{ArbitrageOpportunity, Quote};

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Full market snapshot; replaces the whole store.
    Market(Vec<Quote>),
    /// Full opportunity list; replaces the ledger without deduplication.
    Opportunities(Vec<ArbitrageOpportunity>),
    /// A single opportunity reported by the upstream source.
    Opportunity(ArbitrageOpportunity),
    /// A single venue quote update.
    Quote(Quote),
}

impl FeedMessage {
    /// The `type` tag this message travels under.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedMessage::Market(_) => "market",
            FeedMessage::Opportunities(_) => "opportunities",
            FeedMessage::Opportunity(_) => "opportunity",
            FeedMessage::Quote(_) => "quote",
        }
    }
}

/// Everything the feed manager hands to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The feed channel came up (`true`) or went down (`false`).
    Connectivity(bool),
    Message(FeedMessage),
}
