//! # Arbitrage Detector Crate
//!
//! Maintains the latest quote per venue and pair, scans venues quoting the same
//! pair for profitable crossings, and keeps a bounded history of what it finds.
//! The core (`ArbEngine`) is synchronous; `EngineService` runs it as a single
//! writer behind channels and `EngineHandle` is how the rest of the process talks
//! to it.

pub mod api;
pub mod engine;
pub mod ledger;
pub mod market_state;
pub mod query;
pub mod service;
pub mod strategies;

pub use api::{EngineError, EngineEvent, EngineHandle};
pub use engine::{ArbEngine, MessageOutcome};
pub use ledger::{OpportunityLedger, LEDGER_CAPACITY};
pub use market_state::{MarketState, PairSummary};
pub use query::{OpportunityFilter, Page, PairFilter, QueryError};
pub use service::EngineService;
