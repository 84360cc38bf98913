//! Pseudo-ML prediction module
//!
//! Provides a deliberately simple learned predictor for player props:
//! - Per-game feature extraction (home flag, minutes, short-term form, index)
//! - Correlation-weighted linear model over the recent-game window
//! - Holdout validation (MAPE) driving the confidence score
//! - In-process model cache with time-based staleness and injectable clock
//!
//! The model is a correlation-weighted blend, not a fitted regression. That
//! is a known accuracy limitation carried over deliberately; see DESIGN.md.

pub mod predictor;

#[cfg(test)]
mod tests;

pub use predictor::{
    Clock, MlPrediction, MlPredictor, MlProbability, SystemClock, TrainedLinearModel,
    UpcomingFeatures,
};
