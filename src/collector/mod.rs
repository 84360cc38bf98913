//! Player data collection from the stats provider
//!
//! Builds a `PlayerDataset` season by season: resolve the player, find the
//! team they appeared for, then walk the team schedule pulling box scores.
//! Provider calls are paced to stay under the free-tier rate limit.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::stats::{ApiGame, ApiPlayerGameStats, StatsClient, TeamInfo};
use crate::config::StatsApiConfig;
use crate::error::{EngineError, Result};
use crate::model::DatasetSource;
use crate::storage::PlayerStore;
use crate::types::{GameRecord, PlayerDataset, PlayerInfo, SeasonRecord};

/// Teams probed per season when locating the player's roster spot
const TEAM_PROBE_LIMIT: usize = 5;

pub struct DataCollector {
    client: StatsClient,
    store: PlayerStore,
    seasons: Vec<String>,
    pacing: Duration,
}

impl DataCollector {
    pub fn new(client: StatsClient, store: PlayerStore, config: &StatsApiConfig) -> Self {
        Self {
            client,
            store,
            seasons: config.seasons.clone(),
            pacing: Duration::from_millis(config.pacing_ms),
        }
    }

    /// Collect the configured seasons for a player and cache the result.
    /// Seasons that fail individually are skipped; the collection only
    /// fails outright when nothing at all was found.
    pub async fn collect_player(&self, name: &str) -> Result<PlayerDataset> {
        let candidates = self.client.search_player(name).await?;
        let player = candidates
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::PlayerNotFound(name.to_string()))?;
        info!(player = %player.name, id = player.id, "collecting game logs");

        let mut seasons = Vec::new();
        for season in &self.seasons {
            match self.collect_season(&player, season).await {
                Ok(Some(record)) => {
                    info!(season = %season, games = record.games.len(), "season collected");
                    seasons.push(record);
                }
                Ok(None) => {
                    info!(season = %season, "player not found on probed teams");
                }
                Err(e) => {
                    warn!(season = %season, error = %e, "season collection failed");
                }
            }
        }

        if seasons.is_empty() {
            return Err(EngineError::Other(format!(
                "No historical data found for {}",
                player.name
            )));
        }

        let dataset = PlayerDataset {
            player,
            seasons,
            last_updated: Utc::now(),
        };
        self.store.save(&dataset).await?;
        Ok(dataset)
    }

    /// One season's games, or None when the player's team could not be found
    async fn collect_season(
        &self,
        player: &PlayerInfo,
        season: &str,
    ) -> Result<Option<SeasonRecord>> {
        let teams = self.client.teams(season).await?;
        let Some((team, schedule)) = self.find_team(player, &teams, season).await? else {
            return Ok(None);
        };

        let mut games = Vec::new();
        for game in &schedule {
            tokio::time::sleep(self.pacing).await;
            match self.client.game_player_stats(game.id).await {
                Ok(lines) => {
                    if let Some(line) = lines.iter().find(|l| l.player.id == player.id) {
                        games.push(to_game_record(line, game));
                    }
                }
                Err(e) => {
                    // Future or cancelled games have no box score yet
                    tracing::debug!(game_id = game.id, error = %e, "skipping game");
                }
            }
        }

        if games.is_empty() {
            return Ok(None);
        }
        Ok(Some(SeasonRecord {
            season: season.to_string(),
            team: team.name,
            games,
        }))
    }

    /// Probe the first few teams' opening games for the player's box score
    async fn find_team(
        &self,
        player: &PlayerInfo,
        teams: &[TeamInfo],
        season: &str,
    ) -> Result<Option<(TeamInfo, Vec<ApiGame>)>> {
        for team in teams.iter().take(TEAM_PROBE_LIMIT) {
            tokio::time::sleep(self.pacing).await;
            let schedule = match self.client.team_games(team.id, season).await {
                Ok(games) => games,
                Err(e) => {
                    tracing::debug!(team = %team.name, error = %e, "schedule probe failed");
                    continue;
                }
            };
            let Some(first) = schedule.first() else {
                continue;
            };

            match self.client.game_player_stats(first.id).await {
                Ok(lines) if lines.iter().any(|l| l.player.id == player.id) => {
                    info!(team = %team.name, "player located");
                    return Ok(Some((team.clone(), schedule)));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(team = %team.name, error = %e, "probe failed");
                }
            }
        }
        Ok(None)
    }
}

/// Fractional minutes from the provider's "MM:SS" format; anything
/// malformed reads as 0 (a DNP)
pub fn parse_minutes(raw: &str) -> f64 {
    let mut parts = raw.split(':');
    let (Some(min), Some(sec), None) = (parts.next(), parts.next(), parts.next()) else {
        return 0.0;
    };
    let minutes: f64 = min.trim().parse().unwrap_or(0.0);
    let seconds: f64 = sec.trim().parse().unwrap_or(0.0);
    minutes + seconds / 60.0
}

fn to_game_record(line: &ApiPlayerGameStats, game: &ApiGame) -> GameRecord {
    let is_home = line.team.id == game.teams.home.id;
    let opponent = if is_home {
        game.teams.away.name.clone()
    } else {
        game.teams.home.name.clone()
    };

    let (fgm, fga) = line
        .field_goals
        .as_ref()
        .map_or((0, 0), |s| (s.total, s.attempts));
    let (ftm, fta) = line
        .freethrows_goals
        .as_ref()
        .map_or((0, 0), |s| (s.total, s.attempts));

    GameRecord {
        game_id: game.id,
        date: game.date,
        opponent,
        is_home,
        minutes: parse_minutes(line.minutes.as_deref().unwrap_or("")),
        points: line.points,
        rebounds: line.rebounds.as_ref().map_or(0, |r| r.total),
        assists: line.assists,
        pra: 0,
        points_assists: 0,
        points_rebounds: 0,
        rebounds_assists: 0,
        fgm,
        fga,
        ftm,
        fta,
    }
    .with_derived()
}

/// Cache-first dataset source: read the store, collect on a miss
pub struct StoreBackedSource {
    store: PlayerStore,
    collector: DataCollector,
}

impl StoreBackedSource {
    pub fn new(store: PlayerStore, collector: DataCollector) -> Self {
        Self { store, collector }
    }
}

#[async_trait]
impl DatasetSource for StoreBackedSource {
    async fn load(&self, name_or_id: &str) -> Result<Option<PlayerDataset>> {
        self.store.load(name_or_id).await
    }

    async fn collect(&self, name: &str) -> Result<PlayerDataset> {
        self.collector.collect_player(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stats::{ApiPlayerRef, ApiShooting, ApiTeamRef, ApiTotal, GameTeams};
    use chrono::TimeZone;

    #[test]
    fn test_parse_minutes() {
        assert!((parse_minutes("32:45") - 32.75).abs() < 1e-9);
        assert_eq!(parse_minutes("0:30"), 0.5);
        assert_eq!(parse_minutes("0"), 0.0);
        assert_eq!(parse_minutes(""), 0.0);
        assert_eq!(parse_minutes("32:45:10"), 0.0);
        assert_eq!(parse_minutes("DNP"), 0.0);
    }

    #[test]
    fn test_to_game_record_resolves_sides_and_combos() {
        let game = ApiGame {
            id: 9001,
            date: Utc.with_ymd_and_hms(2025, 1, 10, 19, 0, 0).unwrap(),
            teams: GameTeams {
                home: TeamInfo {
                    id: 149,
                    name: "Denver Nuggets".to_string(),
                },
                away: TeamInfo {
                    id: 150,
                    name: "Miami Heat".to_string(),
                },
            },
        };
        let line = ApiPlayerGameStats {
            player: ApiPlayerRef {
                id: 265,
                name: "Nikola Jokic".to_string(),
            },
            team: ApiTeamRef { id: 149 },
            points: 28,
            rebounds: Some(ApiTotal { total: 14 }),
            assists: 9,
            minutes: Some("36:30".to_string()),
            field_goals: Some(ApiShooting {
                total: 11,
                attempts: 19,
            }),
            freethrows_goals: None,
        };

        let record = to_game_record(&line, &game);
        assert!(record.is_home);
        assert_eq!(record.opponent, "Miami Heat");
        assert!((record.minutes - 36.5).abs() < 1e-9);
        assert_eq!(record.pra, 51);
        assert_eq!(record.points_rebounds, 42);
        assert_eq!(record.fgm, 11);
        assert_eq!(record.ftm, 0);
    }

    #[test]
    fn test_to_game_record_away_side() {
        let game = ApiGame {
            id: 9002,
            date: Utc.with_ymd_and_hms(2025, 1, 12, 19, 0, 0).unwrap(),
            teams: GameTeams {
                home: TeamInfo {
                    id: 150,
                    name: "Miami Heat".to_string(),
                },
                away: TeamInfo {
                    id: 149,
                    name: "Denver Nuggets".to_string(),
                },
            },
        };
        let line = ApiPlayerGameStats {
            player: ApiPlayerRef {
                id: 265,
                name: "Nikola Jokic".to_string(),
            },
            team: ApiTeamRef { id: 149 },
            points: 20,
            rebounds: None,
            assists: 11,
            minutes: None,
            field_goals: None,
            freethrows_goals: None,
        };

        let record = to_game_record(&line, &game);
        assert!(!record.is_home);
        assert_eq!(record.opponent, "Miami Heat");
        assert_eq!(record.minutes, 0.0);
        assert_eq!(record.rebounds, 0);
    }
}
