//! Odds provider client: fixture search and bookmaker prices
//!
//! Two concerns: finding a team's next fixture, and pulling per-bookmaker
//! player-prop prices for an event. Quote extraction matches players by
//! name parts because bookmaker labels carry suffixes like
//! "Stephen Curry (1) (26.5)".

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tracing::debug;

use crate::config::OddsApiConfig;
use crate::error::Result;
use crate::types::{BookmakerQuote, StatType};

#[derive(Clone)]
pub struct OddsClient {
    http: Client,
    base_url: String,
    api_key: String,
    bookmakers: Vec<String>,
    league_slug: String,
}

/// A team's next scheduled fixture
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct NextMatch {
    pub event_id: String,
    pub opponent: String,
    pub is_home: bool,
    pub date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
}

/// Raw event from the fixture search
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEvent {
    pub id: String,
    pub status: String,
    pub date: DateTime<Utc>,
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub league: Option<LeagueRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueRef {
    pub slug: String,
}

/// Odds payload for one event: bookmaker name to its market list
#[derive(Debug, Clone, Deserialize)]
pub struct RawOddsPayload {
    #[serde(default)]
    pub bookmakers: HashMap<String, Vec<OddsMarket>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsMarket {
    pub name: String,
    #[serde(default)]
    pub odds: Vec<OddsEntry>,
    #[serde(default, rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One priced selection inside a market
#[derive(Debug, Clone, Deserialize)]
pub struct OddsEntry {
    #[serde(default)]
    pub label: Option<String>,
    /// The handicap/line for over-under selections
    #[serde(default)]
    pub hdp: Option<f64>,
    #[serde(default, deserialize_with = "lax_f64")]
    pub over: Option<f64>,
    #[serde(default, deserialize_with = "lax_f64")]
    pub under: Option<f64>,
}

/// Decimal odds arrive as numbers or strings depending on the bookmaker
fn lax_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

impl OddsClient {
    pub fn new(config: &OddsApiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            bookmakers: config.bookmakers.clone(),
            league_slug: config.league_slug.clone(),
        })
    }

    /// Upcoming league fixtures matching a team name, soonest first
    pub async fn search_team_events(&self, team_name: &str) -> Result<Vec<OddsEvent>> {
        let url = format!("{}/events/search", self.base_url);
        debug!(team = team_name, "fixture search");

        let events: Vec<OddsEvent> = self
            .http
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str()), ("query", team_name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(upcoming_events(events, &self.league_slug, Utc::now()))
    }

    /// The team's next fixture, if one is scheduled
    pub async fn next_match(&self, team_name: &str) -> Result<Option<NextMatch>> {
        let events = self.search_team_events(team_name).await?;
        Ok(pick_next_match(&events, team_name))
    }

    /// Full odds payload for an event from the configured bookmakers;
    /// None when the provider has nothing priced
    pub async fn event_odds(&self, event_id: &str) -> Result<Option<RawOddsPayload>> {
        let url = format!("{}/odds", self.base_url);
        debug!(event_id, "odds lookup");

        let payload: RawOddsPayload = self
            .http
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("eventId", event_id),
                ("bookmakers", &self.bookmakers.join(",")),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if payload.bookmakers.is_empty() {
            return Ok(None);
        }
        Ok(Some(payload))
    }

    /// Quotes for one player/stat from every configured bookmaker that
    /// prices it; None when no bookmaker carries the player
    pub fn extract_player_quotes(
        &self,
        payload: &RawOddsPayload,
        player_name: &str,
        stat: StatType,
    ) -> Option<HashMap<String, BookmakerQuote>> {
        let mut quotes = HashMap::new();
        for bookmaker in &self.bookmakers {
            if let Some(quote) = extract_quote(payload, player_name, stat, bookmaker) {
                quotes.insert(bookmaker.clone(), quote);
            }
        }
        if quotes.is_empty() {
            None
        } else {
            Some(quotes)
        }
    }
}

/// Pending future fixtures for the league, sorted soonest first
fn upcoming_events(events: Vec<OddsEvent>, league_slug: &str, now: DateTime<Utc>) -> Vec<OddsEvent> {
    let mut upcoming: Vec<OddsEvent> = events
        .into_iter()
        .filter(|e| e.status == "pending")
        .filter(|e| e.league.as_ref().is_some_and(|l| l.slug == league_slug))
        .filter(|e| e.date > now)
        .collect();
    upcoming.sort_by_key(|e| e.date);
    upcoming
}

fn pick_next_match(events: &[OddsEvent], team_name: &str) -> Option<NextMatch> {
    let event = events.first()?;
    let is_home = event
        .home
        .to_lowercase()
        .contains(&team_name.to_lowercase());
    let opponent = if is_home {
        event.away.clone()
    } else {
        event.home.clone()
    };

    Some(NextMatch {
        event_id: event.id.clone(),
        opponent,
        is_home,
        date: event.date,
        home_team: event.home.clone(),
        away_team: event.away.clone(),
    })
}

/// One bookmaker's quote for a player/stat, if it prices that market
fn extract_quote(
    payload: &RawOddsPayload,
    player_name: &str,
    stat: StatType,
    bookmaker: &str,
) -> Option<BookmakerQuote> {
    let markets = payload.bookmakers.get(bookmaker)?;
    let market = markets.iter().find(|m| m.name == stat.market_name())?;

    let name_parts: Vec<String> = player_name
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if name_parts.is_empty() {
        return None;
    }

    let entry = market.odds.iter().find(|odd| {
        let Some(label) = &odd.label else {
            return false;
        };
        // Player name is the label's leading segment before any "(...)"
        let name = label.split('(').next().unwrap_or("").trim().to_lowercase();
        name_parts.iter().all(|part| name.contains(part.as_str()))
    })?;

    Some(BookmakerQuote {
        bookmaker: bookmaker.to_string(),
        line: entry.hdp?,
        over_odds: entry.over?,
        under_odds: entry.under?,
        market_name: market.name.clone(),
        updated_at: market.updated_at,
    })
}
