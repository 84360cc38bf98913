//! Layered configuration: `config.toml` plus `PROPBOT_*` environment overrides

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub stats_api: StatsApiConfig,
    #[serde(default)]
    pub odds_api: OddsApiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Directory holding one JSON blob per player (`player_{id}.json`)
    #[serde(default = "default_data_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsApiConfig {
    #[serde(default = "default_stats_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Provider league id for the NBA
    #[serde(default = "default_league_id")]
    pub league_id: u32,
    #[serde(default = "default_seasons")]
    pub seasons: Vec<String>,
    /// Pause between player-level provider calls, to respect rate limits
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsApiConfig {
    #[serde(default = "default_odds_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_bookmakers")]
    pub bookmakers: Vec<String>,
    #[serde(default = "default_league_slug")]
    pub league_slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Weight given to the recent-game bucket in the weighted average
    #[serde(default = "default_recent_games_weight")]
    pub recent_games_weight: f64,
    /// Qualifying minutes threshold for a game to count
    #[serde(default = "default_min_minutes")]
    pub min_minutes: f64,
    /// Minimum total games for any prediction
    #[serde(default = "default_min_games")]
    pub min_games: usize,
    /// Trained models older than this are retrained
    #[serde(default = "default_model_max_age_hours")]
    pub model_max_age_hours: i64,
    /// EV threshold for the value-bet scan
    #[serde(default = "default_min_ev")]
    pub min_ev: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_stats_url() -> String {
    "https://v1.basketball.api-sports.io".to_string()
}

fn default_league_id() -> u32 {
    12
}

fn default_seasons() -> Vec<String> {
    vec![
        "2022-2023".to_string(),
        "2023-2024".to_string(),
        "2024-2025".to_string(),
    ]
}

fn default_pacing_ms() -> u64 {
    100
}

fn default_odds_url() -> String {
    "https://api.odds-api.io/v3".to_string()
}

fn default_bookmakers() -> Vec<String> {
    vec!["Bet365".to_string(), "Kambi".to_string()]
}

fn default_league_slug() -> String {
    "usa-nba".to_string()
}

fn default_recent_games_weight() -> f64 {
    0.6
}

fn default_min_minutes() -> f64 {
    15.0
}

fn default_min_games() -> usize {
    10
}

fn default_model_max_age_hours() -> i64 {
    168
}

fn default_min_ev() -> f64 {
    0.05
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

impl Default for StatsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_stats_url(),
            api_key: String::new(),
            league_id: default_league_id(),
            seasons: default_seasons(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_odds_url(),
            api_key: String::new(),
            bookmakers: default_bookmakers(),
            league_slug: default_league_slug(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            recent_games_weight: default_recent_games_weight(),
            min_minutes: default_min_minutes(),
            min_games: default_min_games(),
            model_max_age_hours: default_model_max_age_hours(),
            min_ev: default_min_ev(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            stats_api: StatsApiConfig::default(),
            odds_api: OddsApiConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file (optional) with `PROPBOT_*` env overrides,
    /// e.g. `PROPBOT_ODDS_API__API_KEY`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PROPBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Data directory with `~` expanded
    pub fn data_dir(&self) -> String {
        shellexpand::tilde(&self.data.dir).into_owned()
    }
}
