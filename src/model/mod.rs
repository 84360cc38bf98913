//! Probability orchestration for player props
//!
//! Runs the statistical engine and the ML predictor over the same qualifying
//! game log, blends their over/under probabilities by ML confidence, and
//! turns the blend into a bet recommendation plus bookmaker-edge math.

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::analysis::{
    Adjustment, ConfidenceReport, HistoricalSplit, HomeAwaySplit, StatEngine, SummaryBlock,
    TrendAnalysis,
};
use crate::config::AnalysisConfig;
use crate::error::{EngineError, Result};
use crate::ml::{MlPrediction, MlPredictor};
use crate::types::{GameContext, GameFilter, PlayerDataset, StatType};

/// ML influence on the blend is capped at 40%, scaled by its confidence
const ML_WEIGHT_CAP: f64 = 0.4;
/// Below this ML confidence the blend is statistical-only
const MIN_ML_CONFIDENCE: f64 = 0.3;

/// Source of player datasets: a cache read with a collection fallback.
/// Implemented by the storage/collector pair; mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Cached dataset for a player name or id, if one exists
    async fn load(&self, name_or_id: &str) -> Result<Option<PlayerDataset>>;

    /// Fetch and cache a fresh dataset from the stats provider
    async fn collect(&self, name: &str) -> Result<PlayerDataset>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetDirection {
    #[serde(rename = "OVER")]
    Over,
    #[serde(rename = "UNDER")]
    Under,
    #[serde(rename = "NO BET")]
    NoBet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetStrength {
    Strong,
    Moderate,
    Weak,
    None,
}

/// Direction + strength with human-readable reasoning lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub direction: BetDirection,
    pub strength: BetStrength,
    pub reasoning: Vec<String>,
}

/// How the statistical and ML probabilities were combined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendReport {
    pub method: String,
    pub stat_weight: f64,
    pub ml_weight: f64,
}

/// Over/under probabilities, formatted for display and raw for EV math
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityReport {
    pub over: String,
    pub under: String,
    pub raw_over: f64,
    pub raw_under: f64,
}

/// Full prediction for one player/stat/line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub player: String,
    pub prop: String,
    pub stat_type: StatType,
    pub line: f64,
    pub probability: ProbabilityReport,
    /// Projected stat value: recency-weighted average, mean as fallback
    pub projection: f64,
    pub statistics: SummaryBlock,
    pub historical: HistoricalSplit,
    pub trend: TrendAnalysis,
    pub splits: HomeAwaySplit,
    pub ml: MlPrediction,
    pub blend: BlendReport,
    pub confidence: ConfidenceReport,
    pub adjustments: Vec<Adjustment>,
    pub recommendation: Recommendation,
    pub context: GameContext,
    pub generated_at: DateTime<Utc>,
}

/// Per-stat outcome of a multi-prop request; one stat failing never
/// aborts the rest
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PropOutcome {
    Success(Box<PredictionResult>),
    Failure { error: String },
}

/// Our probability measured against a bookmaker's American odds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeReport {
    pub our_probability: f64,
    pub implied_probability: f64,
    pub edge: f64,
    pub has_edge: bool,
}

/// Orchestrates dataset loading, both engines, the blend and the
/// recommendation for a single prop
pub struct ProbabilityCalculator {
    source: Arc<dyn DatasetSource>,
    engine: StatEngine,
    predictor: Arc<MlPredictor>,
    min_games: usize,
    min_minutes: f64,
}

impl ProbabilityCalculator {
    pub fn new(source: Arc<dyn DatasetSource>, config: &AnalysisConfig) -> Self {
        Self {
            source,
            engine: StatEngine::new(config.recent_games_weight),
            predictor: Arc::new(MlPredictor::new(config.model_max_age_hours)),
            min_games: config.min_games,
            min_minutes: config.min_minutes,
        }
    }

    /// Replace the predictor, keeping its model cache shareable with other
    /// components
    pub fn with_predictor(mut self, predictor: Arc<MlPredictor>) -> Self {
        self.predictor = predictor;
        self
    }

    /// Cached dataset for the player, collecting from the provider on a miss
    pub async fn dataset(&self, player: &str) -> Result<PlayerDataset> {
        if let Some(dataset) = self.source.load(player).await? {
            return Ok(dataset);
        }
        tracing::info!(player, "no cached dataset, collecting");
        self.source.collect(player).await
    }

    /// Price one prop: load the log, run both engines, blend, recommend
    pub async fn calculate_probability(
        &self,
        player: &str,
        stat: StatType,
        line: f64,
        context: &GameContext,
    ) -> Result<PredictionResult> {
        let dataset = self.dataset(player).await?;
        let games = dataset.all_games();
        if games.len() < self.min_games {
            return Err(EngineError::InsufficientData {
                found: games.len(),
                required: self.min_games,
            });
        }

        let qualifying = GameFilter::min_minutes(self.min_minutes).apply(&games);

        let analysis = self.engine.analyze_prop(&qualifying, stat, line, context)?;
        let ml = self
            .predictor
            .generate_prediction(&qualifying, stat, context);

        let (raw_over, raw_under, blend) = self.blend(&analysis.probability, &ml, &analysis);
        let recommendation = recommend(raw_over, raw_under, analysis.confidence.score);

        let projection = if analysis.statistics.weighted_avg > 0.0 {
            analysis.statistics.weighted_avg
        } else {
            analysis.statistics.mean
        };

        tracing::debug!(
            player = %dataset.player.name,
            stat = %stat,
            line,
            raw_over,
            method = %blend.method,
            "prop priced"
        );

        Ok(PredictionResult {
            player: dataset.player.name.clone(),
            prop: format!("{} {}", stat.as_str(), line),
            stat_type: stat,
            line,
            probability: ProbabilityReport {
                over: format_percent(raw_over),
                under: format_percent(raw_under),
                raw_over,
                raw_under,
            },
            projection,
            statistics: analysis.statistics,
            historical: analysis.historical,
            trend: analysis.trend,
            splits: analysis.splits,
            ml,
            blend,
            confidence: analysis.confidence,
            adjustments: analysis.adjustments,
            recommendation,
            context: context.clone(),
            generated_at: Utc::now(),
        })
    }

    /// Price several props for one player; failures stay per-stat
    pub async fn calculate_all_props(
        &self,
        player: &str,
        lines: &HashMap<String, f64>,
        context: &GameContext,
    ) -> HashMap<String, PropOutcome> {
        let mut results = HashMap::new();
        for (name, &line) in lines {
            let outcome = match name.parse::<StatType>() {
                Ok(stat) => match self.calculate_probability(player, stat, line, context).await {
                    Ok(result) => PropOutcome::Success(Box::new(result)),
                    Err(e) => {
                        tracing::warn!(player, stat = %name, error = %e, "prop failed");
                        PropOutcome::Failure {
                            error: e.to_string(),
                        }
                    }
                },
                Err(e) => PropOutcome::Failure {
                    error: e.to_string(),
                },
            };
            results.insert(name.clone(), outcome);
        }
        results
    }

    /// Confidence-weighted blend of the statistical and ML probabilities.
    /// Returns (over, under, report).
    fn blend(
        &self,
        statistical: &crate::analysis::ProbabilityBlock,
        ml: &MlPrediction,
        analysis: &crate::analysis::PropAnalysis,
    ) -> (f64, f64, BlendReport) {
        let confidence = ml.confidence();
        let Some(prediction) = ml.prediction() else {
            return statistical_only(statistical);
        };
        if confidence < MIN_ML_CONFIDENCE {
            return statistical_only(statistical);
        }

        // The ML side is priced against the base probability scaled into
        // line units, not against the bookmaker line
        let ml_prob = self.predictor.ml_probability(
            Some(prediction),
            statistical.base * 100.0,
            analysis.statistics.std_dev,
        );

        let ml_weight = confidence * ML_WEIGHT_CAP;
        let stat_weight = 1.0 - ml_weight;
        let over =
            crate::analysis::numeric::clamp01(statistical.over * stat_weight + ml_prob.over * ml_weight);
        let under = crate::analysis::numeric::clamp01(
            statistical.under * stat_weight + ml_prob.under * ml_weight,
        );

        (
            over,
            under,
            BlendReport {
                method: "Hybrid (Statistical + ML)".to_string(),
                stat_weight,
                ml_weight,
            },
        )
    }
}

fn statistical_only(
    statistical: &crate::analysis::ProbabilityBlock,
) -> (f64, f64, BlendReport) {
    (
        statistical.over,
        statistical.under,
        BlendReport {
            method: "Statistical (ML unavailable)".to_string(),
            stat_weight: 1.0,
            ml_weight: 0.0,
        },
    )
}

/// Direction and strength from the blended over probability and the
/// statistical confidence score
pub fn recommend(over: f64, under: f64, confidence: f64) -> Recommendation {
    let direction = if over >= 0.60 {
        BetDirection::Over
    } else if over <= 0.40 {
        BetDirection::Under
    } else {
        return Recommendation {
            direction: BetDirection::NoBet,
            strength: BetStrength::None,
            reasoning: vec![
                "Probability too close to 50/50 - no clear edge".to_string(),
            ],
        };
    };

    let edge = (over - 0.5).abs();
    let strength = if edge >= 0.20 && confidence >= 0.7 {
        BetStrength::Strong
    } else if edge >= 0.15 && confidence >= 0.6 {
        BetStrength::Moderate
    } else if edge >= 0.10 && confidence >= 0.5 {
        BetStrength::Weak
    } else {
        return Recommendation {
            direction: BetDirection::NoBet,
            strength: BetStrength::None,
            reasoning: vec!["Edge or confidence too low".to_string()],
        };
    };

    let winning = match direction {
        BetDirection::Over => over,
        _ => under,
    };
    let mut reasoning = vec![
        format!("Winning probability: {:.1}%", winning * 100.0),
        format!(
            "Confidence: {} ({:.0}%)",
            crate::analysis::confidence_level(confidence),
            confidence * 100.0
        ),
    ];
    if edge >= 0.15 {
        reasoning.push("Strong statistical edge over the 50/50 baseline".to_string());
    }

    Recommendation {
        direction,
        strength,
        reasoning,
    }
}

/// Our probability against a bookmaker's American price
pub fn calculate_edge(our_probability: f64, american_odds: f64) -> EdgeReport {
    let implied = if american_odds > 0.0 {
        100.0 / (american_odds + 100.0)
    } else {
        american_odds.abs() / (american_odds.abs() + 100.0)
    };
    let edge = our_probability - implied;

    EdgeReport {
        our_probability,
        implied_probability: implied,
        edge,
        has_edge: edge > 0.05,
    }
}

fn format_percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}
