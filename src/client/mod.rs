//! HTTP clients for the stats and odds providers

pub mod odds;
pub mod stats;

pub use odds::{NextMatch, OddsClient, RawOddsPayload};
pub use stats::StatsClient;
