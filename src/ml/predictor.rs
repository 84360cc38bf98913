//! Correlation-weighted linear predictor with a per-stat model cache

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::analysis::numeric;
use crate::error::{EngineError, Result};
use crate::types::{GameContext, GameRecord, StatType};

/// Games considered for training (the most recent window)
const TRAINING_WINDOW: usize = 30;
/// Minimum games in the window before the predictor will run
const MIN_TRAINING_GAMES: usize = 10;
/// Games whose preceding context seeds the first feature rows
const WARMUP_GAMES: usize = 5;
/// Most recent games held out for validation
const VALIDATION_GAMES: usize = 10;

pub const MODEL_NAME: &str = "Correlation-weighted linear regression";

/// Clock abstraction so staleness can be tested without waiting a week
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A trained per-stat model. Never persisted; retraining is cheap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedLinearModel {
    /// L1-normalized feature/label correlations:
    /// [is_home, minutes, recent-5 average, normalized game index]
    pub weights: [f64; 4],
    pub feature_count: usize,
    pub trained_at: DateTime<Utc>,
    pub sample_size: usize,
}

/// Features fed to the model for the upcoming game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingFeatures {
    pub home_advantage: bool,
    pub expected_minutes: f64,
    pub recent_form: f64,
}

/// Predictor output: either a usable point prediction or a reason it is
/// unavailable. Unavailability never aborts the caller's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MlPrediction {
    Ready {
        prediction: f64,
        confidence: f64,
        model: String,
        features: UpcomingFeatures,
    },
    Unavailable {
        reason: String,
    },
}

impl MlPrediction {
    pub fn prediction(&self) -> Option<f64> {
        match self {
            MlPrediction::Ready { prediction, .. } => Some(*prediction),
            MlPrediction::Unavailable { .. } => None,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            MlPrediction::Ready { confidence, .. } => *confidence,
            MlPrediction::Unavailable { .. } => 0.0,
        }
    }
}

/// Over/under probabilities implied by a point prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlProbability {
    pub over: f64,
    pub under: f64,
}

/// Pseudo-ML predictor with an in-process model cache keyed by stat type.
///
/// Concurrent retrains for the same stat race benignly: training is
/// deterministic for a given window, so the last writer wins.
pub struct MlPredictor {
    models: RwLock<HashMap<StatType, TrainedLinearModel>>,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl MlPredictor {
    pub fn new(max_age_hours: i64) -> Self {
        Self::with_clock(max_age_hours, Arc::new(SystemClock))
    }

    pub fn with_clock(max_age_hours: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            max_age: Duration::hours(max_age_hours),
            clock,
        }
    }

    /// Predict the next value of `stat` from a newest-first game log.
    ///
    /// Trains (or retrains a stale model) synchronously when needed; all
    /// failure modes come back as `Unavailable`, never as a panic or error.
    pub fn generate_prediction(
        &self,
        games: &[GameRecord],
        stat: StatType,
        context: &GameContext,
    ) -> MlPrediction {
        let window = &games[..games.len().min(TRAINING_WINDOW)];
        if window.len() < MIN_TRAINING_GAMES {
            return MlPrediction::Unavailable {
                reason: format!(
                    "Insufficient data for ML prediction: {} of the last {} games, need {}",
                    window.len(),
                    TRAINING_WINDOW,
                    MIN_TRAINING_GAMES
                ),
            };
        }

        let model = match self.current_or_retrained(window, stat) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(stat = %stat, error = %e, "model training failed");
                return MlPrediction::Unavailable {
                    reason: "Model training failed".to_string(),
                };
            }
        };

        let minutes: Vec<f64> = window.iter().map(|g| g.minutes).collect();
        let expected_minutes = context
            .expected_minutes
            .unwrap_or_else(|| numeric::mean(&minutes));
        let recent_form = numeric::mean(
            &window
                .iter()
                .take(WARMUP_GAMES)
                .map(|g| g.value(stat))
                .collect::<Vec<_>>(),
        );

        let features = [
            if context.is_home.unwrap_or(false) {
                1.0
            } else {
                0.0
            },
            expected_minutes,
            recent_form,
            1.0, // upcoming game sits at the head of the sequence
        ];
        let prediction = predict_value(&model, &features);
        let confidence = self.validation_confidence(window, stat, &model);

        MlPrediction::Ready {
            prediction,
            confidence,
            model: MODEL_NAME.to_string(),
            features: UpcomingFeatures {
                home_advantage: context.is_home.unwrap_or(false),
                expected_minutes,
                recent_form,
            },
        }
    }

    /// Over/under probability implied by a point prediction, treating it as
    /// the mean of a normal distribution. With no historical spread the
    /// model assumes 20% variation around the prediction.
    pub fn ml_probability(
        &self,
        prediction: Option<f64>,
        line: f64,
        historical_std_dev: f64,
    ) -> MlProbability {
        let Some(prediction) = prediction else {
            return MlProbability {
                over: 0.5,
                under: 0.5,
            };
        };

        let std_dev = if historical_std_dev > 0.0 {
            historical_std_dev
        } else {
            prediction * 0.2
        };
        let under = numeric::normal_probability(line, prediction, std_dev);

        MlProbability {
            over: 1.0 - under,
            under,
        }
    }

    /// Copy of the cached model for a stat, if any
    pub fn model_snapshot(&self, stat: StatType) -> Option<TrainedLinearModel> {
        self.models.read().get(&stat).cloned()
    }

    /// Cached model for `stat` if fresh, otherwise a synchronous retrain
    fn current_or_retrained(
        &self,
        window: &[GameRecord],
        stat: StatType,
    ) -> Result<TrainedLinearModel> {
        if let Some(model) = self.models.read().get(&stat) {
            if !self.is_stale(model) {
                return Ok(model.clone());
            }
        }

        let model = self.train(window, stat)?;
        self.models.write().insert(stat, model.clone());
        Ok(model)
    }

    fn is_stale(&self, model: &TrainedLinearModel) -> bool {
        self.clock.now() - model.trained_at > self.max_age
    }

    /// Fit the correlation-weighted model over the window (newest-first in,
    /// trained in chronological order)
    fn train(&self, window: &[GameRecord], stat: StatType) -> Result<TrainedLinearModel> {
        if window.len() < MIN_TRAINING_GAMES {
            return Err(EngineError::InsufficientData {
                found: window.len(),
                required: MIN_TRAINING_GAMES,
            });
        }

        let chronological: Vec<&GameRecord> = window.iter().rev().collect();
        let total = chronological.len();

        let mut rows: Vec<[f64; 4]> = Vec::new();
        let mut labels: Vec<f64> = Vec::new();
        for i in WARMUP_GAMES..total {
            rows.push(feature_row(&chronological, i, stat, total));
            labels.push(chronological[i].value(stat));
        }

        let mut weights = [0.0f64; 4];
        for (j, w) in weights.iter_mut().enumerate() {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            *w = numeric::correlation(&column, &labels);
        }

        let sum_abs: f64 = weights.iter().map(|w| w.abs()).sum();
        if sum_abs == 0.0 {
            return Err(EngineError::ModelTraining(
                "all feature correlations are zero".to_string(),
            ));
        }
        for w in &mut weights {
            *w /= sum_abs;
        }

        Ok(TrainedLinearModel {
            weights,
            feature_count: 4,
            trained_at: self.clock.now(),
            sample_size: rows.len(),
        })
    }

    /// Confidence from replaying the model over the 10 most recent games:
    /// 1 - MAPE, clamped to [0, 1]. Games where the actual was 0 contribute
    /// nothing to the error.
    fn validation_confidence(
        &self,
        window: &[GameRecord],
        stat: StatType,
        model: &TrainedLinearModel,
    ) -> f64 {
        let validation: Vec<&GameRecord> = window
            .iter()
            .take(VALIDATION_GAMES)
            .rev() // chronological within the holdout
            .collect();

        let mut terms: Vec<f64> = Vec::new();
        for i in WARMUP_GAMES..validation.len() {
            let features = feature_row(&validation, i, stat, validation.len());
            let predicted = predict_value(model, &features);
            let actual = validation[i].value(stat);
            terms.push(if actual > 0.0 {
                (predicted - actual).abs() / actual
            } else {
                0.0
            });
        }

        if terms.is_empty() {
            return 0.5;
        }
        numeric::clamp01(1.0 - numeric::mean(&terms))
    }
}

/// Feature vector for the game at `index` of a chronological sequence
pub(crate) fn feature_row(chronological: &[&GameRecord], index: usize, stat: StatType, total: usize) -> [f64; 4] {
    let game = chronological[index];
    let context_start = index.saturating_sub(WARMUP_GAMES);
    let recent: Vec<f64> = chronological[context_start..index]
        .iter()
        .map(|g| g.value(stat))
        .collect();
    let recent_avg = if recent.is_empty() {
        game.value(stat)
    } else {
        numeric::mean(&recent)
    };

    [
        if game.is_home { 1.0 } else { 0.0 },
        game.minutes,
        recent_avg,
        index as f64 / total as f64,
    ]
}

/// Weighted sum of features, floored at zero
pub(crate) fn predict_value(model: &TrainedLinearModel, features: &[f64; 4]) -> f64 {
    let dot: f64 = features
        .iter()
        .zip(&model.weights)
        .map(|(f, w)| f * w)
        .sum();
    dot.max(0.0)
}
