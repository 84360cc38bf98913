//! Statistical analysis of a player's game log for one prop market
//!
//! Combines descriptive statistics, recency weighting, linear trend,
//! historical over/under frequency and home/away splits into a single
//! context-adjusted over probability with a confidence score.
//!
//! All entry points take game lists sorted newest-first; passing a
//! chronological list silently skews the recency weighting, so the order is
//! part of the contract, not an ambient assumption.

pub mod numeric;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::{GameContext, GameRecord, StatType};

/// Descriptive statistics over one stat across a game list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticalSummary {
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub std_dev: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub slope: f64,
    /// R² of the index-vs-value fit
    pub strength: f64,
}

/// Exact over/under/push counts against a line over the full game list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSplit {
    pub over_count: usize,
    pub under_count: usize,
    pub push_count: usize,
    pub over_rate: f64,
    pub under_rate: f64,
    pub push_rate: f64,
    pub total_games: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeAwaySplit {
    pub home_avg: f64,
    pub away_avg: f64,
    /// max(0, (home - away) / home); away-game disadvantage is not negative
    pub impact: f64,
    pub home_games: usize,
    pub away_games: usize,
}

/// One applied probability adjustment, in application order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub factor: String,
    pub impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub score: f64,
    pub level: String,
    pub consistency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityBlock {
    pub over: f64,
    pub under: f64,
    pub base: f64,
}

/// Full statistical read on one prop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropAnalysis {
    pub stat_type: StatType,
    pub line: f64,
    pub probability: ProbabilityBlock,
    pub statistics: SummaryBlock,
    pub historical: HistoricalSplit,
    pub trend: TrendAnalysis,
    pub splits: HomeAwaySplit,
    pub confidence: ConfidenceReport,
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryBlock {
    pub mean: f64,
    pub median: f64,
    pub weighted_avg: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

/// Inputs to the factor-adjustment pass
#[derive(Debug, Clone, Default)]
struct AdjustmentFactors {
    is_home: Option<bool>,
    home_away_impact: f64,
    trend_direction: Option<TrendDirection>,
    expected_minutes: Option<f64>,
    avg_minutes: Option<f64>,
}

/// Statistical analysis engine, parameterized on the recency weight
#[derive(Debug, Clone)]
pub struct StatEngine {
    recent_games_weight: f64,
}

impl Default for StatEngine {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl StatEngine {
    pub fn new(recent_games_weight: f64) -> Self {
        Self {
            recent_games_weight,
        }
    }

    /// Descriptive statistics for `stat`; None for an empty game list
    pub fn calculate_stats(
        &self,
        games: &[GameRecord],
        stat: StatType,
    ) -> Option<StatisticalSummary> {
        let values: Vec<f64> = games.iter().map(|g| g.value(stat)).collect();
        if values.is_empty() {
            return None;
        }

        Some(StatisticalSummary {
            mean: numeric::mean(&values),
            median: numeric::median(&values),
            mode: numeric::mode(&values),
            std_dev: numeric::std_dev(&values),
            variance: numeric::variance(&values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            q1: numeric::quantile(&values, 0.25),
            q3: numeric::quantile(&values, 0.75),
            sample_size: values.len(),
        })
    }

    /// Recency-weighted average. The "recent" bucket is the first
    /// min(10, floor(0.3 * N)) games of the newest-first list.
    pub fn weighted_average(&self, games: &[GameRecord], stat: StatType) -> f64 {
        if games.is_empty() {
            return 0.0;
        }

        let recent_count = 10.min((games.len() as f64 * 0.3).floor() as usize);
        let (recent, older) = games.split_at(recent_count);

        let recent_values: Vec<f64> = recent.iter().map(|g| g.value(stat)).collect();
        let older_values: Vec<f64> = older.iter().map(|g| g.value(stat)).collect();

        let recent_avg = if recent_values.is_empty() {
            0.0
        } else {
            numeric::mean(&recent_values)
        };
        let older_avg = if older_values.is_empty() {
            recent_avg
        } else {
            numeric::mean(&older_values)
        };

        recent_avg * self.recent_games_weight + older_avg * (1.0 - self.recent_games_weight)
    }

    /// OLS trend over the chronological game sequence
    pub fn trend(&self, games: &[GameRecord], stat: StatType) -> TrendAnalysis {
        if games.len() < 3 {
            return TrendAnalysis {
                direction: TrendDirection::Stable,
                slope: 0.0,
                strength: 0.0,
            };
        }

        // Newest-first in, chronological for the fit
        let values: Vec<f64> = games.iter().rev().map(|g| g.value(stat)).collect();
        let (slope, r_squared) = numeric::linear_regression(&values);

        let direction = if slope > 0.5 {
            TrendDirection::Increasing
        } else if slope < -0.5 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        TrendAnalysis {
            direction,
            slope,
            strength: r_squared,
        }
    }

    /// Exact over/under/push counts against the line
    pub fn over_under(&self, games: &[GameRecord], stat: StatType, line: f64) -> HistoricalSplit {
        let values: Vec<f64> = games.iter().map(|g| g.value(stat)).collect();
        let total = values.len();
        let over = values.iter().filter(|&&v| v > line).count();
        let under = values.iter().filter(|&&v| v < line).count();
        let push = values.iter().filter(|&&v| v == line).count();

        let rate = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };

        HistoricalSplit {
            over_count: over,
            under_count: under,
            push_count: push,
            over_rate: rate(over),
            under_rate: rate(under),
            push_rate: rate(push),
            total_games: total,
        }
    }

    /// Mean stat at home vs away; zeroed when either side has no sample
    pub fn home_away_split(&self, games: &[GameRecord], stat: StatType) -> HomeAwaySplit {
        let home: Vec<&GameRecord> = games.iter().filter(|g| g.is_home).collect();
        let away: Vec<&GameRecord> = games.iter().filter(|g| !g.is_home).collect();

        if home.is_empty() || away.is_empty() {
            return HomeAwaySplit {
                home_avg: 0.0,
                away_avg: 0.0,
                impact: 0.0,
                home_games: home.len(),
                away_games: away.len(),
            };
        }

        let home_avg = numeric::mean(&home.iter().map(|g| g.value(stat)).collect::<Vec<_>>());
        let away_avg = numeric::mean(&away.iter().map(|g| g.value(stat)).collect::<Vec<_>>());
        let impact = if home_avg == 0.0 {
            0.0
        } else {
            ((home_avg - away_avg) / home_avg).max(0.0)
        };

        HomeAwaySplit {
            home_avg,
            away_avg,
            impact,
            home_games: home.len(),
            away_games: away.len(),
        }
    }

    /// 1 - coefficient of variation, clamped to [0, 1]
    pub fn consistency_score(&self, games: &[GameRecord], stat: StatType) -> f64 {
        let Some(stats) = self.calculate_stats(games, stat) else {
            return 0.0;
        };
        if stats.mean == 0.0 {
            return 0.0;
        }
        numeric::clamp01(1.0 - stats.std_dev / stats.mean)
    }

    /// Confidence from sample size (capped at 50 games) and consistency
    pub fn confidence(&self, sample_size: usize, consistency: f64) -> ConfidenceReport {
        let size_confidence = (sample_size as f64 / 50.0).min(1.0);
        let score = size_confidence * 0.4 + consistency * 0.6;

        ConfidenceReport {
            score,
            level: confidence_level(score).to_string(),
            consistency,
        }
    }

    fn adjust_for_factors(&self, base: f64, factors: &AdjustmentFactors) -> (f64, Vec<Adjustment>) {
        let mut prob = base;
        let mut adjustments = Vec::new();

        if let Some(is_home) = factors.is_home {
            let impact = factors.home_away_impact;
            if is_home && impact > 0.0 {
                prob += impact;
                adjustments.push(Adjustment {
                    factor: "Home Court".to_string(),
                    impact: format!("+{:.1}%", impact * 100.0),
                });
            } else if !is_home && impact > 0.0 {
                prob -= impact * 0.7;
                adjustments.push(Adjustment {
                    factor: "Away Game".to_string(),
                    impact: format!("-{:.1}%", impact * 0.7 * 100.0),
                });
            }
        }

        match factors.trend_direction {
            Some(TrendDirection::Increasing) => {
                prob += 0.05;
                adjustments.push(Adjustment {
                    factor: "Upward Trend".to_string(),
                    impact: "+5.0%".to_string(),
                });
            }
            Some(TrendDirection::Decreasing) => {
                prob -= 0.05;
                adjustments.push(Adjustment {
                    factor: "Downward Trend".to_string(),
                    impact: "-5.0%".to_string(),
                });
            }
            _ => {}
        }

        if let (Some(expected), Some(avg)) = (factors.expected_minutes, factors.avg_minutes) {
            if avg > 0.0 {
                let impact = (expected - avg) / avg * 0.1;
                prob += impact;
                // Sub-percent playing-time shifts are applied but not reported
                if impact.abs() > 0.01 {
                    adjustments.push(Adjustment {
                        factor: "Playing Time".to_string(),
                        impact: format!(
                            "{}{:.1}%",
                            if impact >= 0.0 { "+" } else { "" },
                            impact * 100.0
                        ),
                    });
                }
            }
        }

        (numeric::clamp01(prob), adjustments)
    }

    /// Full prop analysis over a newest-first game list
    pub fn analyze_prop(
        &self,
        games: &[GameRecord],
        stat: StatType,
        line: f64,
        context: &GameContext,
    ) -> Result<PropAnalysis> {
        let stats = self
            .calculate_stats(games, stat)
            .ok_or(EngineError::InsufficientData {
                found: 0,
                required: 1,
            })?;

        let weighted_avg = self.weighted_average(games, stat);
        let trend = self.trend(games, stat);
        let historical = self.over_under(games, stat, line);
        let splits = self.home_away_split(games, stat);

        let normal_prob = numeric::normal_probability(line, stats.mean, stats.std_dev);
        let base = historical.over_rate * 0.6 + (1.0 - normal_prob) * 0.4;

        let avg_minutes = {
            let minutes: Vec<f64> = games.iter().map(|g| g.minutes).collect();
            if minutes.is_empty() {
                None
            } else {
                Some(numeric::mean(&minutes))
            }
        };

        let factors = AdjustmentFactors {
            is_home: context.is_home,
            home_away_impact: splits.impact,
            trend_direction: Some(trend.direction),
            expected_minutes: context.expected_minutes,
            avg_minutes,
        };
        let (adjusted, adjustments) = self.adjust_for_factors(base, &factors);

        let consistency = self.consistency_score(games, stat);
        let confidence = self.confidence(games.len(), consistency);

        Ok(PropAnalysis {
            stat_type: stat,
            line,
            probability: ProbabilityBlock {
                over: adjusted,
                under: 1.0 - adjusted,
                base,
            },
            statistics: SummaryBlock {
                mean: stats.mean,
                median: stats.median,
                weighted_avg,
                std_dev: stats.std_dev,
                min: stats.min,
                max: stats.max,
                q1: stats.q1,
                q3: stats.q3,
            },
            historical,
            trend,
            splits,
            confidence,
            adjustments,
        })
    }
}

/// Display label for a confidence score
pub fn confidence_level(score: f64) -> &'static str {
    if score >= 0.8 {
        "Very High"
    } else if score >= 0.65 {
        "High"
    } else if score >= 0.5 {
        "Moderate"
    } else if score >= 0.35 {
        "Low"
    } else {
        "Very Low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn game(day: u32, points: u32, is_home: bool, minutes: f64) -> GameRecord {
        GameRecord {
            game_id: day as u64,
            date: Utc.with_ymd_and_hms(2024, 11, day, 19, 0, 0).unwrap(),
            opponent: "Miami Heat".to_string(),
            is_home,
            minutes,
            points,
            rebounds: 5,
            assists: 4,
            pra: 0,
            points_assists: 0,
            points_rebounds: 0,
            rebounds_assists: 0,
            fgm: 0,
            fga: 0,
            ftm: 0,
            fta: 0,
        }
        .with_derived()
    }

    /// Newest-first log with the given point totals (index 0 = most recent)
    fn log(points: &[u32]) -> Vec<GameRecord> {
        points
            .iter()
            .enumerate()
            .map(|(i, &p)| game(28 - i as u32, p, i % 2 == 0, 34.0))
            .collect()
    }

    #[test]
    fn test_stats_ordering_invariants() {
        let games = log(&[12, 25, 31, 8, 19, 22, 27, 15, 30, 11]);
        let stats = StatEngine::default()
            .calculate_stats(&games, StatType::Points)
            .unwrap();

        assert!(stats.min <= stats.q1);
        assert!(stats.q1 <= stats.median);
        assert!(stats.median <= stats.q3);
        assert!(stats.q3 <= stats.max);
        assert!(stats.mean >= stats.min && stats.mean <= stats.max);
        assert_eq!(stats.sample_size, 10);
    }

    #[test]
    fn test_weighted_average_constant_log_is_exact() {
        let games = log(&[20; 25]);
        let avg = StatEngine::new(0.6).weighted_average(&games, StatType::Points);
        assert_eq!(avg, 20.0);
    }

    #[test]
    fn test_weighted_average_favors_recent_games() {
        // 6 recent games at 30 fill the whole recent bucket (floor(20*0.3) = 6)
        let mut points = vec![30u32; 6];
        points.extend(vec![10u32; 14]);
        let games = log(&points);

        let avg = StatEngine::new(0.6).weighted_average(&games, StatType::Points);
        let plain = 16.0; // (6*30 + 14*10) / 20
        assert!(avg > plain);
    }

    #[test]
    fn test_weighted_average_small_log_uses_older_bucket_only() {
        // floor(2 * 0.3) = 0 recent games; the recent mean degenerates to 0
        let games = log(&[20, 20]);
        let avg = StatEngine::new(0.6).weighted_average(&games, StatType::Points);
        assert_eq!(avg, 8.0);
    }

    #[test]
    fn test_trend_directions() {
        let engine = StatEngine::default();

        // Newest-first rising log: chronological slope is positive
        let rising = log(&[28, 24, 20, 16, 12, 8]);
        let trend = engine.trend(&rising, StatType::Points);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!(trend.slope > 0.5);
        assert!(trend.strength > 0.9);

        let falling = log(&[8, 12, 16, 20, 24, 28]);
        assert_eq!(
            engine.trend(&falling, StatType::Points).direction,
            TrendDirection::Decreasing
        );

        let flat = log(&[20, 20, 20, 20]);
        assert_eq!(
            engine.trend(&flat, StatType::Points).direction,
            TrendDirection::Stable
        );

        // Too short for a fit
        let short = log(&[10, 30]);
        let trend = engine.trend(&short, StatType::Points);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.slope, 0.0);
    }

    #[test]
    fn test_alternating_log_historical_counts() {
        let points: Vec<u32> = (0..20).map(|i| if i % 2 == 0 { 10 } else { 30 }).collect();
        let games = log(&points);

        let hist = StatEngine::default().over_under(&games, StatType::Points, 20.0);
        assert_eq!(hist.over_count, 10);
        assert_eq!(hist.under_count, 10);
        assert_eq!(hist.push_count, 0);
        assert_eq!(hist.over_rate, 0.5);
    }

    #[test]
    fn test_push_counting() {
        let games = log(&[20, 20, 25, 15]);
        let hist = StatEngine::default().over_under(&games, StatType::Points, 20.0);
        assert_eq!(hist.push_count, 2);
        assert_eq!(hist.over_count, 1);
        assert_eq!(hist.under_count, 1);
    }

    #[test]
    fn test_home_away_split_never_negative_impact() {
        // Home games (even indices) score less than away games
        let games = log(&[10, 30, 10, 30, 10, 30]);
        let split = StatEngine::default().home_away_split(&games, StatType::Points);
        assert_eq!(split.impact, 0.0);
        assert_eq!(split.home_avg, 10.0);
        assert_eq!(split.away_avg, 30.0);
    }

    #[test]
    fn test_home_away_split_single_sided_log() {
        let games: Vec<GameRecord> = (1..5).map(|d| game(d, 20, true, 30.0)).collect();
        let split = StatEngine::default().home_away_split(&games, StatType::Points);
        assert_eq!(split.impact, 0.0);
        assert_eq!(split.away_games, 0);
    }

    #[test]
    fn test_confidence_levels() {
        let engine = StatEngine::default();
        assert_eq!(engine.confidence(50, 1.0).level, "Very High");
        assert_eq!(engine.confidence(50, 0.5).level, "High");
        assert_eq!(engine.confidence(10, 0.2).level, "Very Low");
    }

    #[test]
    fn test_consistency_zero_mean_degenerates() {
        let games = log(&[0, 0, 0, 0]);
        assert_eq!(
            StatEngine::default().consistency_score(&games, StatType::Points),
            0.0
        );
    }

    #[test]
    fn test_analyze_prop_probability_stays_clamped() {
        let engine = StatEngine::default();
        let games = log(&[40, 42, 38, 44, 41, 39, 43, 40, 42, 41, 40, 39]);

        // Absurd context pushing probability way up
        let context = GameContext {
            is_home: Some(true),
            opponent: None,
            expected_minutes: Some(200.0),
        };
        let analysis = engine
            .analyze_prop(&games, StatType::Points, 10.0, &context)
            .unwrap();
        assert!(analysis.probability.over <= 1.0);
        assert!(analysis.probability.over >= 0.0);
        assert!(analysis.probability.under >= 0.0);

        // And way down
        let context = GameContext {
            is_home: Some(false),
            opponent: None,
            expected_minutes: Some(1.0),
        };
        let analysis = engine
            .analyze_prop(&games, StatType::Points, 60.0, &context)
            .unwrap();
        assert!(analysis.probability.over >= 0.0);
        assert!(analysis.probability.under <= 1.0);
    }

    #[test]
    fn test_analyze_prop_records_adjustments_in_order() {
        // Home scoring advantage so the home-court factor fires
        let games = log(&[30, 10, 30, 10, 30, 10, 30, 10, 30, 10]);
        let context = GameContext {
            is_home: Some(true),
            opponent: None,
            expected_minutes: Some(40.0),
        };
        let analysis = StatEngine::default()
            .analyze_prop(&games, StatType::Points, 20.0, &context)
            .unwrap();

        let factors: Vec<&str> = analysis
            .adjustments
            .iter()
            .map(|a| a.factor.as_str())
            .collect();
        assert_eq!(factors[0], "Home Court");
        assert!(factors.contains(&"Playing Time"));
    }

    #[test]
    fn test_analyze_prop_empty_log_is_insufficient() {
        let result = StatEngine::default().analyze_prop(
            &[],
            StatType::Points,
            20.0,
            &GameContext::default(),
        );
        assert!(matches!(result, Err(EngineError::InsufficientData { .. })));
    }
}
