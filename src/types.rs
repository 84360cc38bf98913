//! Core data model: game records, player datasets, stat types, bookmaker quotes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Prop markets the engine can price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Points,
    Rebounds,
    Assists,
    /// Points + rebounds + assists
    Pra,
    PointsAssists,
    PointsRebounds,
    ReboundsAssists,
}

impl StatType {
    pub const ALL: [StatType; 7] = [
        StatType::Points,
        StatType::Rebounds,
        StatType::Assists,
        StatType::Pra,
        StatType::PointsAssists,
        StatType::PointsRebounds,
        StatType::ReboundsAssists,
    ];

    /// Wire name used in requests and cached JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            StatType::Points => "points",
            StatType::Rebounds => "rebounds",
            StatType::Assists => "assists",
            StatType::Pra => "pra",
            StatType::PointsAssists => "points_assists",
            StatType::PointsRebounds => "points_rebounds",
            StatType::ReboundsAssists => "rebounds_assists",
        }
    }

    /// Market name as the odds provider labels it
    pub fn market_name(&self) -> &'static str {
        match self {
            StatType::Points => "Points O/U",
            StatType::Rebounds => "Rebounds O/U",
            StatType::Assists => "Assists O/U",
            StatType::Pra => "Points, Assists & Rebounds O/U",
            StatType::PointsAssists => "Points & Assists O/U",
            StatType::PointsRebounds => "Points & Rebounds O/U",
            StatType::ReboundsAssists => "Assists & Rebounds O/U",
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "points" => Ok(StatType::Points),
            "rebounds" => Ok(StatType::Rebounds),
            "assists" => Ok(StatType::Assists),
            "pra" => Ok(StatType::Pra),
            "points_assists" => Ok(StatType::PointsAssists),
            "points_rebounds" => Ok(StatType::PointsRebounds),
            "rebounds_assists" => Ok(StatType::ReboundsAssists),
            other => Err(EngineError::UnknownStatType(other.to_string())),
        }
    }
}

/// One played game for one player, normalized from the stats provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: u64,
    pub date: DateTime<Utc>,
    pub opponent: String,
    pub is_home: bool,
    /// Fractional minutes (e.g. "32:45" parses to 32.75)
    pub minutes: f64,
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    // Combined stats are recomputable from the base counts. Old cache files
    // may lack them or carry stale values, so all_games() rebuilds them.
    #[serde(default)]
    pub pra: u32,
    #[serde(default)]
    pub points_assists: u32,
    #[serde(default)]
    pub points_rebounds: u32,
    #[serde(default)]
    pub rebounds_assists: u32,
    #[serde(default)]
    pub fgm: u32,
    #[serde(default)]
    pub fga: u32,
    #[serde(default)]
    pub ftm: u32,
    #[serde(default)]
    pub fta: u32,
}

impl GameRecord {
    /// Recompute the combined stats from the base counts
    pub fn with_derived(mut self) -> Self {
        self.pra = self.points + self.rebounds + self.assists;
        self.points_assists = self.points + self.assists;
        self.points_rebounds = self.points + self.rebounds;
        self.rebounds_assists = self.rebounds + self.assists;
        self
    }

    /// Value of the given stat in this game
    pub fn value(&self, stat: StatType) -> f64 {
        let v = match stat {
            StatType::Points => self.points,
            StatType::Rebounds => self.rebounds,
            StatType::Assists => self.assists,
            StatType::Pra => self.pra,
            StatType::PointsAssists => self.points_assists,
            StatType::PointsRebounds => self.points_rebounds,
            StatType::ReboundsAssists => self.rebounds_assists,
        };
        v as f64
    }
}

/// Player identity as resolved by the stats provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: u64,
    pub name: String,
}

/// One season's games for one team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub season: String,
    pub team: String,
    pub games: Vec<GameRecord>,
}

/// Cached per-player record: identity plus per-season game logs.
/// Immutable once written; re-collection replaces the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDataset {
    pub player: PlayerInfo,
    pub seasons: Vec<SeasonRecord>,
    pub last_updated: DateTime<Utc>,
}

impl PlayerDataset {
    /// All games across seasons, newest first, combined stats rebuilt.
    /// Date ties have no defined order.
    pub fn all_games(&self) -> Vec<GameRecord> {
        let mut games: Vec<GameRecord> = self
            .seasons
            .iter()
            .flat_map(|s| s.games.iter().cloned())
            .map(GameRecord::with_derived)
            .collect();
        games.sort_by(|a, b| b.date.cmp(&a.date));
        games
    }

    /// The `count` most recent games
    pub fn recent_games(&self, count: usize) -> Vec<GameRecord> {
        let mut games = self.all_games();
        games.truncate(count);
        games
    }

    /// Team the player most recently suited up for
    pub fn latest_team(&self) -> Option<&str> {
        self.seasons.last().map(|s| s.team.as_str())
    }
}

/// Filtering criteria for game lists
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    pub is_home: Option<bool>,
    pub min_minutes: Option<f64>,
    pub opponent: Option<String>,
}

impl GameFilter {
    pub fn min_minutes(minutes: f64) -> Self {
        Self {
            min_minutes: Some(minutes),
            ..Default::default()
        }
    }

    pub fn apply(&self, games: &[GameRecord]) -> Vec<GameRecord> {
        games
            .iter()
            .filter(|g| self.is_home.map_or(true, |h| g.is_home == h))
            .filter(|g| self.min_minutes.map_or(true, |m| g.minutes >= m))
            .filter(|g| {
                self.opponent.as_ref().map_or(true, |o| {
                    g.opponent.to_lowercase().contains(&o.to_lowercase())
                })
            })
            .cloned()
            .collect()
    }
}

/// Context for the upcoming game a prop refers to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameContext {
    #[serde(default)]
    pub is_home: Option<bool>,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub expected_minutes: Option<f64>,
}

/// A single bookmaker's price for one player prop (decimal odds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmakerQuote {
    pub bookmaker: String,
    pub line: f64,
    pub over_odds: f64,
    pub under_odds: f64,
    pub market_name: String,
    pub updated_at: Option<DateTime<Utc>>,
}
