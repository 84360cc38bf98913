//! HTTP API for predictions, odds comparison and the value-bet stream

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::client::{NextMatch, OddsClient, StatsClient};
use crate::collector::{DataCollector, StoreBackedSource};
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::model::{calculate_edge, EdgeReport, PredictionResult, ProbabilityCalculator, PropOutcome};
use crate::odds::{OddsAssessment, OddsReconciler, NO_EVENT_ID, ODDS_NOT_AVAILABLE, PLAYER_NOT_IN_ODDS};
use crate::scanner::{ScanEvent, ValueScanner};
use crate::storage::PlayerStore;
use crate::types::{GameContext, PlayerInfo, StatType};

pub struct AppState {
    config: Config,
    store: PlayerStore,
    calculator: Arc<ProbabilityCalculator>,
    odds: OddsClient,
    reconciler: OddsReconciler,
    scanner: ValueScanner,
}

impl AppState {
    /// Wire the whole stack together from config
    pub fn from_config(config: Config) -> Result<Self> {
        let store = PlayerStore::new(config.data_dir());
        let stats_client = StatsClient::new(&config.stats_api)?;
        let odds = OddsClient::new(&config.odds_api)?;

        let collector = DataCollector::new(stats_client, store.clone(), &config.stats_api);
        let source = Arc::new(StoreBackedSource::new(store.clone(), collector));
        let calculator = Arc::new(ProbabilityCalculator::new(source, &config.analysis));
        let scanner = ValueScanner::new(store.clone(), odds.clone(), calculator.clone());

        Ok(Self {
            reconciler: OddsReconciler::new(config.analysis.min_ev),
            store,
            calculator,
            odds,
            scanner,
            config,
        })
    }
}

/// Engine errors mapped onto HTTP statuses
struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::PlayerNotFound(_) | EngineError::TeamNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InsufficientData { .. } | EngineError::UnknownStatType(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    player: String,
    stat_type: StatType,
    line: f64,
    #[serde(default)]
    context: GameContext,
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    player: String,
    lines: HashMap<String, f64>,
    #[serde(default)]
    context: GameContext,
}

#[derive(Debug, Deserialize)]
struct PredictOddsRequest {
    player: String,
    stat_type: StatType,
    line: f64,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    context: GameContext,
}

#[derive(Debug, Serialize)]
struct PredictOddsResponse {
    prediction: PredictionResult,
    odds: OddsAssessment,
}

#[derive(Debug, Deserialize)]
struct EdgeRequest {
    probability: f64,
    american_odds: f64,
}

#[derive(Debug, Serialize)]
struct NextMatchResponse {
    has_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_match: Option<NextMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueBetsQuery {
    #[serde(default)]
    min_ev: Option<f64>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> std::result::Result<Json<PredictionResult>, ApiError> {
    let result = state
        .calculator
        .calculate_probability(&req.player, req.stat_type, req.line, &req.context)
        .await?;
    Ok(Json(result))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Json<HashMap<String, PropOutcome>> {
    let results = state
        .calculator
        .calculate_all_props(&req.player, &req.lines, &req.context)
        .await;
    Json(results)
}

async fn predict_with_odds(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictOddsRequest>,
) -> std::result::Result<Json<PredictOddsResponse>, ApiError> {
    let prediction = state
        .calculator
        .calculate_probability(&req.player, req.stat_type, req.line, &req.context)
        .await?;

    let odds = match &req.event_id {
        None => OddsAssessment::unavailable(NO_EVENT_ID),
        Some(event_id) => match state.odds.event_odds(event_id).await {
            Ok(Some(payload)) => {
                match state
                    .odds
                    .extract_player_quotes(&payload, &prediction.player, req.stat_type)
                {
                    Some(quotes) => state.reconciler.reconcile(
                        prediction.probability.raw_over,
                        prediction.probability.raw_under,
                        &quotes,
                    ),
                    None => OddsAssessment::unavailable(PLAYER_NOT_IN_ODDS),
                }
            }
            Ok(None) => OddsAssessment::unavailable(ODDS_NOT_AVAILABLE),
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "odds lookup failed");
                OddsAssessment::unavailable(ODDS_NOT_AVAILABLE)
            }
        },
    };

    Ok(Json(PredictOddsResponse { prediction, odds }))
}

async fn edge(Json(req): Json<EdgeRequest>) -> Json<EdgeReport> {
    Json(calculate_edge(req.probability, req.american_odds))
}

async fn next_match(
    State(state): State<Arc<AppState>>,
    Path(team): Path<String>,
) -> std::result::Result<Json<NextMatchResponse>, ApiError> {
    let response = match state.odds.next_match(&team).await? {
        Some(next_match) => NextMatchResponse {
            has_match: true,
            next_match: Some(next_match),
            message: None,
        },
        None => NextMatchResponse {
            has_match: false,
            next_match: None,
            message: Some("No upcoming matches found".to_string()),
        },
    };
    Ok(Json(response))
}

async fn players(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<Vec<PlayerInfo>>, ApiError> {
    Ok(Json(state.store.list_players().await?))
}

/// Streams scan progress and qualifying bets as server-sent events.
/// Partial results stand even if a later player fails; a trailing error
/// event is the only signal before the stream closes.
async fn value_bets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ValueBetsQuery>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let min_ev = query.min_ev.unwrap_or(state.config.analysis.min_ev);
    let (tx, rx) = mpsc::channel::<ScanEvent>(32);

    tokio::spawn(async move {
        state.scanner.scan(min_ev, tx).await;
    });

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let sse = Event::default()
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().data("{}"));
        Some((Ok(sse), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/predict", post(predict))
        .route("/api/analyze", post(analyze))
        .route("/api/predict-odds", post(predict_with_odds))
        .route("/api/edge", post(edge))
        .route("/api/next-match/{team}", get(next_match))
        .route("/api/players", get(players))
        .route("/api/value-bets", get(value_bets))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config)?);
    let app = create_router(state);

    info!("server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
