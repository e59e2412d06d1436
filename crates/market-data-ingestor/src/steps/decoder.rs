//! Decoding of `{type, data, timestamp?}` feed envelopes.

use common::messages::FeedMessage;
use common::types::{ArbitrageOpportunity, Quote};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid `{kind}` payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// A market snapshot arrives either keyed (`"Binance-BTC/USDT": {...}`) or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MarketPayload {
    Keyed(BTreeMap<String, Quote>),
    List(Vec<Quote>),
}

impl MarketPayload {
    fn into_quotes(self) -> Vec<Quote> {
        match self {
            MarketPayload::Keyed(entries) => entries.into_values().collect(),
            MarketPayload::List(quotes) => quotes,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &'static str, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::InvalidPayload { kind, source })
}

/// Decodes one text frame. Frames with an unrecognised `type` yield `Ok(None)`.
pub fn decode_frame(text: &str) -> Result<Option<FeedMessage>, DecodeError> {
    let envelope: Envelope = serde_json::from_str(text)?;

    let message = match envelope.kind.as_str() {
        "market" => FeedMessage::Market(
            payload::<MarketPayload>("market", envelope.data)?.into_quotes(),
        ),
        "opportunities" => FeedMessage::Opportunities(payload::<Vec<ArbitrageOpportunity>>(
            "opportunities",
            envelope.data,
        )?),
        "opportunity" => FeedMessage::Opportunity(payload("opportunity", envelope.data)?),
        "quote" => FeedMessage::Quote(payload("quote", envelope.data)?),
        _ => return Ok(None),
    };
    Ok(Some(message))
}
