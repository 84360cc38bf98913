//! Value-bet scan across every cached player
//!
//! Walks the player store, looks up each player's next fixture, prices an
//! estimated line for the core stats, and emits any bookmaker side whose
//! expected value clears the threshold. Events stream through a channel so
//! the server can push them to clients as they happen; one player failing
//! never stops the scan.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::OddsClient;
use crate::model::ProbabilityCalculator;
use crate::odds::expected_value;
use crate::storage::PlayerStore;
use crate::types::{GameContext, PlayerDataset, StatType};

/// Stats scanned for every player
const SCAN_STATS: [StatType; 3] = [StatType::Points, StatType::Rebounds, StatType::Assists];

/// One qualifying bet found by the scan
#[derive(Debug, Clone, Serialize)]
pub struct ValueBet {
    pub player: String,
    pub team: String,
    pub opponent: String,
    pub is_home: bool,
    pub match_date: DateTime<Utc>,
    pub stat_type: String,
    pub bet: String,
    pub line: f64,
    pub odds: f64,
    pub bookmaker: String,
    pub ev: String,
    pub ev_raw: f64,
    pub our_probability: String,
    pub implied_probability: String,
    pub projection: String,
}

/// Progressive scan output, one event per message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Bet {
        data: Box<ValueBet>,
    },
    Progress {
        processed: usize,
        total: usize,
        player: String,
    },
    Complete,
    Error {
        message: String,
    },
}

pub struct ValueScanner {
    store: PlayerStore,
    odds: OddsClient,
    calculator: std::sync::Arc<ProbabilityCalculator>,
}

impl ValueScanner {
    pub fn new(
        store: PlayerStore,
        odds: OddsClient,
        calculator: std::sync::Arc<ProbabilityCalculator>,
    ) -> Self {
        Self {
            store,
            odds,
            calculator,
        }
    }

    /// Scan every cached player, sending events until done or the receiver
    /// goes away. A top-level failure is reported as a final Error event.
    pub async fn scan(&self, min_ev: f64, tx: mpsc::Sender<ScanEvent>) {
        info!(min_ev, "value-bet scan started");
        match self.run(min_ev, &tx).await {
            Ok(processed) => {
                info!(processed, "value-bet scan complete");
                let _ = tx.send(ScanEvent::Complete).await;
            }
            Err(e) => {
                warn!(error = %e, "value-bet scan aborted");
                let _ = tx
                    .send(ScanEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn run(&self, min_ev: f64, tx: &mpsc::Sender<ScanEvent>) -> crate::error::Result<usize> {
        let players = self.store.list_players().await?;
        info!(total = players.len(), "players to analyze");

        let mut processed = 0usize;
        for player in &players {
            let Some(dataset) = self.store.load_by_id(player.id).await? else {
                continue;
            };

            if let Err(e) = self.scan_player(&dataset, min_ev, tx).await {
                // Per-player provider hiccups don't stop the scan
                warn!(player = %player.name, error = %e, "player skipped");
            }

            processed += 1;
            let progress = ScanEvent::Progress {
                processed,
                total: players.len(),
                player: player.name.clone(),
            };
            if tx.send(progress).await.is_err() {
                debug!("scan receiver dropped, stopping");
                return Ok(processed);
            }
        }
        Ok(processed)
    }

    async fn scan_player(
        &self,
        dataset: &PlayerDataset,
        min_ev: f64,
        tx: &mpsc::Sender<ScanEvent>,
    ) -> crate::error::Result<()> {
        let player_name = dataset.player.name.clone();
        let Some(team) = dataset.latest_team().map(str::to_string) else {
            return Ok(());
        };

        let Some(next_match) = self.odds.next_match(&team).await? else {
            debug!(player = %player_name, "no upcoming match");
            return Ok(());
        };
        let Some(payload) = self.odds.event_odds(&next_match.event_id).await? else {
            debug!(player = %player_name, "no odds for next match");
            return Ok(());
        };

        let context = GameContext {
            is_home: Some(next_match.is_home),
            opponent: Some(next_match.opponent.clone()),
            expected_minutes: None,
        };
        let recent = dataset.recent_games(10);

        for stat in SCAN_STATS {
            let values: Vec<f64> = recent.iter().map(|g| g.value(stat)).collect();
            let Some(line) = estimate_line(&values) else {
                continue;
            };

            let prediction = match self
                .calculator
                .calculate_probability(&player_name, stat, line, &context)
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    debug!(player = %player_name, stat = %stat, error = %e, "prop skipped");
                    continue;
                }
            };

            let Some(quotes) = self.odds.extract_player_quotes(&payload, &player_name, stat)
            else {
                continue;
            };

            for (bookmaker, quote) in &quotes {
                let sides = [
                    ("OVER", prediction.probability.raw_over, quote.over_odds),
                    ("UNDER", prediction.probability.raw_under, quote.under_odds),
                ];
                for (side, prob, odds) in sides {
                    let ev = expected_value(prob, odds);
                    if ev <= min_ev {
                        continue;
                    }
                    let bet = ValueBet {
                        player: player_name.clone(),
                        team: team.clone(),
                        opponent: next_match.opponent.clone(),
                        is_home: next_match.is_home,
                        match_date: next_match.date,
                        stat_type: stat.as_str().to_uppercase(),
                        bet: side.to_string(),
                        line: quote.line,
                        odds,
                        bookmaker: bookmaker.clone(),
                        ev: format!("{:.2}%", ev * 100.0),
                        ev_raw: ev,
                        our_probability: format!("{:.1}%", prob * 100.0),
                        implied_probability: format!("{:.1}%", 100.0 / odds),
                        projection: format!("{:.1}", prediction.projection),
                    };
                    if tx.send(ScanEvent::Bet { data: Box::new(bet) }).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Estimated line from recent stat values: the average rounded to the
/// nearest half point
fn estimate_line(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some((avg * 2.0).round() / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_line_rounds_to_half_points() {
        assert_eq!(estimate_line(&[24.0, 25.0]), Some(24.5));
        assert_eq!(estimate_line(&[10.0, 10.0, 10.6]), Some(10.0));
        assert_eq!(estimate_line(&[27.8]), Some(28.0));
        assert_eq!(estimate_line(&[]), None);
    }

    #[test]
    fn test_scan_event_wire_shape() {
        let event = ScanEvent::Progress {
            processed: 3,
            total: 12,
            player: "Jamal Murray".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["processed"], 3);

        let done = serde_json::to_value(ScanEvent::Complete).unwrap();
        assert_eq!(done["type"], "complete");
    }
}
