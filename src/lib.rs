//! NBA player-prop probability engine
//!
//! Turns a player's cached game log into over/under probabilities for prop
//! markets, compares them against live bookmaker prices, and surfaces the
//! bets with positive expected value.
//!
//! ## Architecture
//!
//! ```text
//! Collector (stats API) → PlayerStore (JSON per player)
//!                              ↓
//!          StatEngine ← ProbabilityCalculator → MlPredictor
//!                              ↓
//!              OddsReconciler ← OddsClient (fixtures + prices)
//!                              ↓
//!                    Server / Scanner (SSE)
//! ```

pub mod analysis;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod ml;
pub mod model;
pub mod odds;
pub mod scanner;
pub mod server;
pub mod storage;
pub mod types;
