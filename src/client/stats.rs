//! Stats provider client (api-sports basketball)
//!
//! Thin wrapper over the provider's REST surface. Responses arrive in a
//! `{ response: [...] }` envelope; numeric stat fields show up as numbers
//! or strings depending on the endpoint, so parsing is deliberately lax
//! and degrades to zero rather than failing a whole game log.

use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::config::StatsApiConfig;
use crate::error::Result;
use crate::types::PlayerInfo;

#[derive(Clone)]
pub struct StatsClient {
    http: Client,
    base_url: String,
    api_key: String,
    league_id: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    response: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamInfo {
    pub id: u64,
    pub name: String,
}

/// A scheduled or played game from the provider's team schedule
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGame {
    pub id: u64,
    pub date: chrono::DateTime<chrono::Utc>,
    pub teams: GameTeams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameTeams {
    pub home: TeamInfo,
    pub away: TeamInfo,
}

/// One player's box score line for one game
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPlayerGameStats {
    pub player: ApiPlayerRef,
    pub team: ApiTeamRef,
    #[serde(default, deserialize_with = "lax_u32")]
    pub points: u32,
    #[serde(default)]
    pub rebounds: Option<ApiTotal>,
    #[serde(default, deserialize_with = "lax_u32")]
    pub assists: u32,
    /// "MM:SS" as reported, empty or missing for DNPs
    #[serde(default)]
    pub minutes: Option<String>,
    #[serde(default)]
    pub field_goals: Option<ApiShooting>,
    #[serde(default)]
    pub freethrows_goals: Option<ApiShooting>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPlayerRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTeamRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTotal {
    #[serde(default, deserialize_with = "lax_u32")]
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiShooting {
    #[serde(default, deserialize_with = "lax_u32")]
    pub total: u32,
    #[serde(default, deserialize_with = "lax_u32")]
    pub attempts: u32,
}

/// Accepts numbers, numeric strings, or null; anything else reads as 0
fn lax_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

impl StatsClient {
    pub fn new(config: &StatsApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            league_id: config.league_id,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, "stats provider request");

        let envelope: Envelope<T> = self
            .http
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.response)
    }

    /// Players matching a free-text name search
    pub async fn search_player(&self, name: &str) -> Result<Vec<PlayerInfo>> {
        self.get("players", &[("search", name.to_string())]).await
    }

    /// League teams for a season
    pub async fn teams(&self, season: &str) -> Result<Vec<TeamInfo>> {
        self.get(
            "teams",
            &[
                ("league", self.league_id.to_string()),
                ("season", season.to_string()),
            ],
        )
        .await
    }

    /// A team's full schedule for a season
    pub async fn team_games(&self, team_id: u64, season: &str) -> Result<Vec<ApiGame>> {
        self.get(
            "games",
            &[
                ("team", team_id.to_string()),
                ("league", self.league_id.to_string()),
                ("season", season.to_string()),
            ],
        )
        .await
    }

    /// Per-player box scores for one game
    pub async fn game_player_stats(&self, game_id: u64) -> Result<Vec<ApiPlayerGameStats>> {
        self.get("games/statistics/players", &[("id", game_id.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_score_parses_mixed_number_formats() {
        let json = serde_json::json!({
            "player": { "id": 265, "name": "Nikola Jokic" },
            "team": { "id": 149 },
            "points": "28",
            "rebounds": { "total": 14 },
            "assists": 9,
            "minutes": "36:30",
            "field_goals": { "total": "11", "attempts": 19 }
        });

        let stats: ApiPlayerGameStats = serde_json::from_value(json).unwrap();
        assert_eq!(stats.points, 28);
        assert_eq!(stats.rebounds.unwrap().total, 14);
        assert_eq!(stats.assists, 9);
        let fg = stats.field_goals.unwrap();
        assert_eq!(fg.total, 11);
        assert_eq!(fg.attempts, 19);
    }

    #[test]
    fn test_box_score_missing_fields_default_to_zero() {
        let json = serde_json::json!({
            "player": { "id": 1 },
            "team": { "id": 2 },
            "points": null
        });

        let stats: ApiPlayerGameStats = serde_json::from_value(json).unwrap();
        assert_eq!(stats.points, 0);
        assert_eq!(stats.assists, 0);
        assert!(stats.rebounds.is_none());
        assert!(stats.minutes.is_none());
    }

    #[test]
    fn test_envelope_tolerates_missing_response() {
        let envelope: Envelope<TeamInfo> = serde_json::from_str("{}").unwrap();
        assert!(envelope.response.is_empty());
    }
}
