//! # Arb Monitor Common Crate
//!
//! This crate provides common data types, error definitions and the feed
//! message model used across the `arb-monitor` workspace.

/// Module for common error types.
pub mod errors;

/// Messages passed from the feed into the engine.
pub mod messages;

/// Module for common data structures and types.
pub mod types;

// Re-export key items for easier access.
pub use errors::CommonError;
pub use messages::{FeedEvent, FeedMessage};
pub use types::{ArbitrageOpportunity, Asset, AssetPair, OpportunityKey, Quote, Stats, Venue};
