//! Expected value against bookmaker prices
//!
//! Takes the calculator's raw over/under probabilities and a set of
//! bookmaker quotes for the same prop, computes per-bookmaker EV on both
//! sides, and picks the single best side to play.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::BookmakerQuote;

/// The three distinct reasons odds can be missing; clients display these
/// verbatim so the wording is part of the contract.
pub const NO_EVENT_ID: &str = "No event ID provided";
pub const ODDS_NOT_AVAILABLE: &str = "Odds not available for this event";
pub const PLAYER_NOT_IN_ODDS: &str = "Player not found in odds";

/// Expected profit per unit staked at decimal odds under probability `p`
pub fn expected_value(p: f64, decimal_odds: f64) -> f64 {
    p * (decimal_odds - 1.0) - (1.0 - p)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueSide {
    #[serde(rename = "OVER")]
    Over,
    #[serde(rename = "UNDER")]
    Under,
    #[serde(rename = "NO VALUE")]
    NoValue,
}

/// One bookmaker's quote priced against our probabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmakerValue {
    pub quote: BookmakerQuote,
    pub implied_over: f64,
    pub implied_under: f64,
    pub over_ev: f64,
    pub under_ev: f64,
}

/// The best price found for one side of the prop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideValue {
    pub bookmaker: String,
    pub odds: f64,
    pub ev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueRecommendation {
    pub side: ValueSide,
    pub bookmaker: Option<String>,
    pub ev: Option<f64>,
}

/// Odds verdict attached to a prediction. Missing odds are a state, not
/// an error; the prediction itself stands either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OddsAssessment {
    Available {
        bookmakers: HashMap<String, BookmakerValue>,
        best_over: Option<SideValue>,
        best_under: Option<SideValue>,
        recommendation: ValueRecommendation,
    },
    Unavailable {
        reason: String,
    },
}

impl OddsAssessment {
    pub fn unavailable(reason: &str) -> Self {
        OddsAssessment::Unavailable {
            reason: reason.to_string(),
        }
    }
}

/// Reconciles model probabilities with bookmaker quotes
#[derive(Debug, Clone)]
pub struct OddsReconciler {
    /// Minimum EV for a side to be worth recommending
    min_ev: f64,
}

impl Default for OddsReconciler {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl OddsReconciler {
    pub fn new(min_ev: f64) -> Self {
        Self { min_ev }
    }

    /// Price every quote on both sides and pick the best one.
    ///
    /// Only one side is ever recommended; when both clear the EV threshold
    /// the over side wins unless the under side is strictly better.
    pub fn reconcile(
        &self,
        raw_over: f64,
        raw_under: f64,
        quotes: &HashMap<String, BookmakerQuote>,
    ) -> OddsAssessment {
        if quotes.is_empty() {
            return OddsAssessment::unavailable(PLAYER_NOT_IN_ODDS);
        }

        let mut bookmakers = HashMap::new();
        let mut best_over: Option<SideValue> = None;
        let mut best_under: Option<SideValue> = None;

        for (name, quote) in quotes {
            let over_ev = expected_value(raw_over, quote.over_odds);
            let under_ev = expected_value(raw_under, quote.under_odds);

            if best_over.as_ref().map_or(true, |b| over_ev > b.ev) {
                best_over = Some(SideValue {
                    bookmaker: name.clone(),
                    odds: quote.over_odds,
                    ev: over_ev,
                });
            }
            if best_under.as_ref().map_or(true, |b| under_ev > b.ev) {
                best_under = Some(SideValue {
                    bookmaker: name.clone(),
                    odds: quote.under_odds,
                    ev: under_ev,
                });
            }

            bookmakers.insert(
                name.clone(),
                BookmakerValue {
                    quote: quote.clone(),
                    implied_over: 1.0 / quote.over_odds,
                    implied_under: 1.0 / quote.under_odds,
                    over_ev,
                    under_ev,
                },
            );
        }

        let under_ev = best_under.as_ref().map_or(f64::NEG_INFINITY, |b| b.ev);

        let recommendation = match (&best_over, &best_under) {
            (Some(over), _) if over.ev > self.min_ev && over.ev >= under_ev => {
                ValueRecommendation {
                    side: ValueSide::Over,
                    bookmaker: Some(over.bookmaker.clone()),
                    ev: Some(over.ev),
                }
            }
            (_, Some(under)) if under.ev > self.min_ev => ValueRecommendation {
                side: ValueSide::Under,
                bookmaker: Some(under.bookmaker.clone()),
                ev: Some(under.ev),
            },
            _ => ValueRecommendation {
                side: ValueSide::NoValue,
                bookmaker: None,
                ev: None,
            },
        };

        OddsAssessment::Available {
            bookmakers,
            best_over,
            best_under,
            recommendation,
        }
    }
}
