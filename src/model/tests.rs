//! Integration tests for the probability orchestrator

use super::*;
use chrono::TimeZone;

use crate::types::{GameRecord, PlayerInfo, SeasonRecord};

fn game(day: u32, points: u32, minutes: f64) -> GameRecord {
    GameRecord {
        game_id: day as u64,
        date: Utc.with_ymd_and_hms(2025, 1, day, 19, 0, 0).unwrap(),
        opponent: "Miami Heat".to_string(),
        is_home: day % 2 == 0,
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
}

fn dataset(games: Vec<GameRecord>) -> PlayerDataset {
    PlayerDataset {
        player: PlayerInfo {
            id: 77,
            name: "Test Player".to_string(),
        },
        seasons: vec![SeasonRecord {
            season: "2024-2025".to_string(),
            team: "Denver Nuggets".to_string(),
            games,
        }],
        last_updated: Utc::now(),
    }
}

fn varied_games(n: u32) -> Vec<GameRecord> {
    (1..=n)
        .map(|day| game(day, 18 + (day % 9) * 2, 30.0 + (day % 6) as f64))
        .collect()
}

fn calculator(source: MockDatasetSource) -> ProbabilityCalculator {
    ProbabilityCalculator::new(Arc::new(source), &AnalysisConfig::default())
}

#[tokio::test]
async fn test_calculate_probability_end_to_end() {
    let data = dataset(varied_games(25));
    let mut source = MockDatasetSource::new();
    source
        .expect_load()
        .returning(move |_| Ok(Some(data.clone())));

    let calc = calculator(source);
    let result = calc
        .calculate_probability("test player", StatType::Points, 24.5, &GameContext::default())
        .await
        .unwrap();

    assert_eq!(result.player, "Test Player");
    assert_eq!(result.prop, "points 24.5");
    assert!((0.0..=1.0).contains(&result.probability.raw_over));
    assert!((0.0..=1.0).contains(&result.probability.raw_under));
    assert_eq!(
        result.probability.over,
        format!("{:.1}%", result.probability.raw_over * 100.0)
    );
    assert!(result.projection > 0.0);
    assert_eq!(result.historical.total_games, 25);
}

#[tokio::test]
async fn test_cache_miss_triggers_collection() {
    let data = dataset(varied_games(20));
    let mut source = MockDatasetSource::new();
    source.expect_load().returning(|_| Ok(None));
    source
        .expect_collect()
        .times(1)
        .returning(move |_| Ok(data.clone()));

    let calc = calculator(source);
    let result = calc
        .calculate_probability("test player", StatType::Points, 22.5, &GameContext::default())
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_short_log_is_insufficient_data() {
    let data = dataset(varied_games(5));
    let mut source = MockDatasetSource::new();
    source
        .expect_load()
        .returning(move |_| Ok(Some(data.clone())));

    let calc = calculator(source);
    let err = calc
        .calculate_probability("test player", StatType::Points, 22.5, &GameContext::default())
        .await
        .unwrap_err();
    match err {
        EngineError::InsufficientData { found, required } => {
            assert_eq!(found, 5);
            assert_eq!(required, 10);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_low_minute_games_do_not_qualify() {
    // 20 full games plus 5 garbage-time appearances
    let mut games = varied_games(20);
    games.extend((21..=25).map(|day| game(day, 2, 6.0)));
    let data = dataset(games);

    let mut source = MockDatasetSource::new();
    source
        .expect_load()
        .returning(move |_| Ok(Some(data.clone())));

    let calc = calculator(source);
    let result = calc
        .calculate_probability("test player", StatType::Points, 22.5, &GameContext::default())
        .await
        .unwrap();
    assert_eq!(result.historical.total_games, 20);
}

#[tokio::test]
async fn test_flat_log_falls_back_to_statistical_only() {
    // Constant log: model training has nothing to correlate
    let data = dataset((1..=15).map(|day| game(day, 20, 32.0)).collect());
    let mut source = MockDatasetSource::new();
    source
        .expect_load()
        .returning(move |_| Ok(Some(data.clone())));

    let calc = calculator(source);
    let result = calc
        .calculate_probability("test player", StatType::Points, 24.5, &GameContext::default())
        .await
        .unwrap();

    assert_eq!(result.blend.method, "Statistical (ML unavailable)");
    assert_eq!(result.blend.ml_weight, 0.0);
    assert!(matches!(result.ml, MlPrediction::Unavailable { .. }));
}

#[tokio::test]
async fn test_calculate_all_props_partial_failure() {
    let data = dataset(varied_games(25));
    let mut source = MockDatasetSource::new();
    source
        .expect_load()
        .returning(move |_| Ok(Some(data.clone())));

    let calc = calculator(source);
    let lines = HashMap::from([
        ("points".to_string(), 24.5),
        ("steals".to_string(), 1.5),
    ]);
    let results = calc
        .calculate_all_props("test player", &lines, &GameContext::default())
        .await;

    assert_eq!(results.len(), 2);
    assert!(matches!(results["points"], PropOutcome::Success(_)));
    match &results["steals"] {
        PropOutcome::Failure { error } => assert!(error.contains("steals")),
        PropOutcome::Success(_) => panic!("unknown stat must fail"),
    }
}

#[test]
fn test_recommendation_thresholds() {
    assert_eq!(recommend(0.60, 0.40, 0.8).direction, BetDirection::Over);
    assert_eq!(recommend(0.599999, 0.400001, 0.8).direction, BetDirection::NoBet);
    assert_eq!(recommend(0.40, 0.60, 0.8).direction, BetDirection::Under);
    assert_eq!(recommend(0.401, 0.599, 0.8).direction, BetDirection::NoBet);

    let no_bet = recommend(0.5, 0.5, 0.9);
    assert_eq!(no_bet.strength, BetStrength::None);
    assert_eq!(
        no_bet.reasoning,
        vec!["Probability too close to 50/50 - no clear edge".to_string()]
    );
}

#[test]
fn test_recommendation_strength_tiers() {
    assert_eq!(recommend(0.72, 0.28, 0.75).strength, BetStrength::Strong);
    assert_eq!(recommend(0.66, 0.34, 0.65).strength, BetStrength::Moderate);
    assert_eq!(recommend(0.62, 0.38, 0.55).strength, BetStrength::Weak);

    // Direction clears but confidence does not
    let downgraded = recommend(0.62, 0.38, 0.3);
    assert_eq!(downgraded.direction, BetDirection::NoBet);
    assert_eq!(
        downgraded.reasoning,
        vec!["Edge or confidence too low".to_string()]
    );
}

#[test]
fn test_recommendation_reasoning_mentions_winning_probability() {
    let rec = recommend(0.35, 0.65, 0.75);
    assert_eq!(rec.direction, BetDirection::Under);
    assert!(rec.reasoning[0].contains("65.0%"));
    assert!(rec.reasoning[1].starts_with("Confidence:"));
    // Edge 0.15 triggers the callout
    assert_eq!(rec.reasoning.len(), 3);
}

#[test]
fn test_edge_from_american_odds() {
    let plus = calculate_edge(0.5, 150.0);
    assert!((plus.implied_probability - 0.40).abs() < 1e-9);
    assert!((plus.edge - 0.10).abs() < 1e-9);
    assert!(plus.has_edge);

    let minus = calculate_edge(0.5, -200.0);
    assert!((minus.implied_probability - 2.0 / 3.0).abs() < 1e-9);
    assert!(!minus.has_edge);
}

#[test]
fn test_edge_threshold_is_strict() {
    // Implied 0.50 at +100; edge of exactly 0.05 does not qualify
    let report = calculate_edge(0.55, 100.0);
    assert!((report.edge - 0.05).abs() < 1e-9);
    assert!(!report.has_edge);
}
