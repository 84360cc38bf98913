//! Integration tests for the ML module

use super::*;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::types::{GameContext, GameRecord, StatType};

fn game(day: u32, points: u32, minutes: f64, is_home: bool) -> GameRecord {
    GameRecord {
        game_id: day as u64,
        date: Utc.with_ymd_and_hms(2025, 1, day, 19, 0, 0).unwrap(),
        opponent: "Miami Heat".to_string(),
        is_home,
        minutes,
        points,
        rebounds: points / 3,
        assists: points / 4,
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

/// Newest-first log of `n` games where scoring tracks minutes played
fn varied_log(n: u32) -> Vec<GameRecord> {
    (1..=n)
        .rev()
        .map(|day| {
            let minutes = 28.0 + (day % 7) as f64;
            let points = 10 + (day % 7) * 3;
            game(day, points, minutes, day % 2 == 0)
        })
        .collect()
}

struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: RwLock::new(now),
        })
    }

    fn advance_hours(&self, hours: i64) {
        let mut now = self.now.write();
        *now += chrono::Duration::hours(hours);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[test]
fn test_short_log_is_unavailable_not_an_error() {
    let predictor = MlPredictor::new(168);
    let games = varied_log(9);

    let prediction =
        predictor.generate_prediction(&games, StatType::Points, &GameContext::default());
    match prediction {
        MlPrediction::Unavailable { reason } => {
            assert!(reason.contains("Insufficient data"), "reason: {reason}");
        }
        MlPrediction::Ready { .. } => panic!("9 games must not produce a prediction"),
    }
}

#[test]
fn test_adequate_log_produces_bounded_prediction() {
    let predictor = MlPredictor::new(168);
    let games = varied_log(25);
    let context = GameContext {
        is_home: Some(true),
        opponent: None,
        expected_minutes: Some(33.0),
    };

    let prediction = predictor.generate_prediction(&games, StatType::Points, &context);
    match prediction {
        MlPrediction::Ready {
            prediction,
            confidence,
            model,
            features,
        } => {
            assert!(prediction >= 0.0);
            assert!((0.0..=1.0).contains(&confidence));
            assert_eq!(model, predictor::MODEL_NAME);
            assert!(features.home_advantage);
            assert_eq!(features.expected_minutes, 33.0);
            // Recent form is the average of the five most recent games
            let expected: f64 = games[..5].iter().map(|g| g.points as f64).sum::<f64>() / 5.0;
            assert!((features.recent_form - expected).abs() < 1e-9);
        }
        MlPrediction::Unavailable { reason } => panic!("unexpected: {reason}"),
    }
}

#[test]
fn test_constant_log_reports_training_failure() {
    let predictor = MlPredictor::new(168);
    // Every feature and label is flat, so no correlation can carry weight
    let games: Vec<GameRecord> = (1..=15).map(|day| game(day, 20, 32.0, true)).collect();

    let prediction =
        predictor.generate_prediction(&games, StatType::Points, &GameContext::default());
    match prediction {
        MlPrediction::Unavailable { reason } => {
            assert_eq!(reason, "Model training failed");
        }
        MlPrediction::Ready { .. } => panic!("flat log must not train"),
    }
}

#[test]
fn test_fresh_model_is_reused() {
    let clock = ManualClock::at(Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap());
    let predictor = MlPredictor::with_clock(168, clock.clone());
    let games = varied_log(25);

    predictor.generate_prediction(&games, StatType::Points, &GameContext::default());
    let first = predictor
        .model_snapshot(StatType::Points)
        .expect("model cached after first prediction");

    clock.advance_hours(24);
    predictor.generate_prediction(&games, StatType::Points, &GameContext::default());
    let second = predictor.model_snapshot(StatType::Points).unwrap();

    assert_eq!(first.trained_at, second.trained_at);
}

#[test]
fn test_stale_model_is_retrained() {
    let clock = ManualClock::at(Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap());
    let predictor = MlPredictor::with_clock(168, clock.clone());
    let games = varied_log(25);

    predictor.generate_prediction(&games, StatType::Points, &GameContext::default());
    let first = predictor.model_snapshot(StatType::Points).unwrap();

    clock.advance_hours(169);
    predictor.generate_prediction(&games, StatType::Points, &GameContext::default());
    let second = predictor.model_snapshot(StatType::Points).unwrap();

    assert!(second.trained_at > first.trained_at);
}

#[test]
fn test_models_cached_per_stat_type() {
    let predictor = MlPredictor::new(168);
    let games = varied_log(25);

    predictor.generate_prediction(&games, StatType::Points, &GameContext::default());
    predictor.generate_prediction(&games, StatType::Rebounds, &GameContext::default());

    assert!(predictor.model_snapshot(StatType::Points).is_some());
    assert!(predictor.model_snapshot(StatType::Rebounds).is_some());
    assert!(predictor.model_snapshot(StatType::Assists).is_none());
}

#[test]
fn test_ml_probability_without_prediction_is_even() {
    let predictor = MlPredictor::new(168);
    let p = predictor.ml_probability(None, 25.5, 6.0);
    assert_eq!(p.over, 0.5);
    assert_eq!(p.under, 0.5);
}

#[test]
fn test_ml_probability_line_below_prediction_favors_over() {
    let predictor = MlPredictor::new(168);
    let p = predictor.ml_probability(Some(28.0), 22.5, 6.0);
    assert!(p.over > 0.5);
    assert!((p.over + p.under - 1.0).abs() < 1e-9);
}

#[test]
fn test_ml_probability_zero_spread_falls_back_to_fraction_of_prediction() {
    let predictor = MlPredictor::new(168);
    // Spread falls back to 20% of the prediction, so the line one fallback
    // sigma above the mean lands near the 84th percentile
    let p = predictor.ml_probability(Some(20.0), 24.0, 0.0);
    assert!((p.under - 0.8413).abs() < 0.001);
}

#[test]
fn test_predict_value_floors_at_zero() {
    let model = TrainedLinearModel {
        weights: [-1.0, 0.0, 0.0, 0.0],
        feature_count: 4,
        trained_at: Utc::now(),
        sample_size: 20,
    };
    assert_eq!(predictor::predict_value(&model, &[1.0, 30.0, 18.0, 1.0]), 0.0);
}

#[test]
fn test_feature_row_recent_average() {
    let games = varied_log(12);
    let chronological: Vec<&GameRecord> = games.iter().rev().collect();

    // First game has no context; its own value seeds the form feature
    let row = predictor::feature_row(&chronological, 0, StatType::Points, chronological.len());
    assert_eq!(row[2], chronological[0].points as f64);

    // Deeper in the sequence the form feature is the prior-5 average
    let row = predictor::feature_row(&chronological, 8, StatType::Points, chronological.len());
    let expected: f64 = chronological[3..8]
        .iter()
        .map(|g| g.points as f64)
        .sum::<f64>()
        / 5.0;
    assert!((row[2] - expected).abs() < 1e-9);
    assert_eq!(row[3], 8.0 / 12.0);
}
