//! NBA player-prop probability engine
//!
//! CLI entry point: serve the HTTP API, or run one-off predictions,
//! collections and scans from the terminal.

use clap::{Parser, Subcommand};
use propbot::{
    client::{OddsClient, StatsClient},
    collector::{DataCollector, StoreBackedSource},
    config::Config,
    model::ProbabilityCalculator,
    scanner::{ScanEvent, ValueScanner},
    server,
    storage::PlayerStore,
    types::{GameContext, StatType},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "propbot")]
#[command(about = "Over/under probability engine for NBA player props")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,
    /// Price a single prop
    Predict {
        /// Player name or id
        player: String,
        /// Stat type (points, rebounds, assists, pra, ...)
        stat_type: StatType,
        /// The over/under line
        line: f64,
        /// Upcoming game is at home
        #[arg(long, conflicts_with = "away")]
        home: bool,
        /// Upcoming game is away
        #[arg(long)]
        away: bool,
        /// Expected minutes for the upcoming game
        #[arg(long)]
        minutes: Option<f64>,
    },
    /// Price several props for one player
    Analyze {
        player: String,
        /// Prop lines as stat=line pairs, e.g. points=26.5
        #[arg(short, long = "line", value_parser = parse_prop_line, required = true)]
        lines: Vec<(String, f64)>,
    },
    /// Collect (or refresh) a player's game logs from the stats provider
    Collect { player: String },
    /// Scan all cached players for positive-EV bets
    Scan {
        /// Minimum expected value per unit staked
        #[arg(long)]
        min_ev: Option<f64>,
    },
    /// List cached players
    Players,
}

fn parse_prop_line(raw: &str) -> Result<(String, f64), String> {
    let (stat, line) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected stat=line, got \"{raw}\""))?;
    let line: f64 = line
        .parse()
        .map_err(|_| format!("\"{line}\" is not a number"))?;
    Ok((stat.to_string(), line))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => server::run(config).await,
        Commands::Predict {
            player,
            stat_type,
            line,
            home,
            away,
            minutes,
        } => {
            let context = GameContext {
                is_home: if home {
                    Some(true)
                } else if away {
                    Some(false)
                } else {
                    None
                },
                opponent: None,
                expected_minutes: minutes,
            };
            let calculator = build_calculator(&config)?;
            let result = calculator
                .calculate_probability(&player, stat_type, line, &context)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Analyze { player, lines } => {
            let lines: HashMap<String, f64> = lines.into_iter().collect();
            let calculator = build_calculator(&config)?;
            let results = calculator
                .calculate_all_props(&player, &lines, &GameContext::default())
                .await;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Commands::Collect { player } => {
            let store = PlayerStore::new(config.data_dir());
            let client = StatsClient::new(&config.stats_api)?;
            let collector = DataCollector::new(client, store, &config.stats_api);
            let dataset = collector.collect_player(&player).await?;

            let games: usize = dataset.seasons.iter().map(|s| s.games.len()).sum();
            println!(
                "Collected {} games across {} seasons for {}",
                games,
                dataset.seasons.len(),
                dataset.player.name
            );
            Ok(())
        }
        Commands::Scan { min_ev } => {
            let min_ev = min_ev.unwrap_or(config.analysis.min_ev);
            let store = PlayerStore::new(config.data_dir());
            let odds = OddsClient::new(&config.odds_api)?;
            let calculator = Arc::new(build_calculator(&config)?);
            let scanner = ValueScanner::new(store, odds, calculator);

            let (tx, mut rx) = mpsc::channel(32);
            let scan = tokio::spawn(async move { scanner.scan(min_ev, tx).await });

            while let Some(event) = rx.recv().await {
                match &event {
                    ScanEvent::Bet { .. } => {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                    ScanEvent::Progress {
                        processed,
                        total,
                        player,
                    } => {
                        eprintln!("[{processed}/{total}] {player}");
                    }
                    ScanEvent::Complete => eprintln!("scan complete"),
                    ScanEvent::Error { message } => eprintln!("scan failed: {message}"),
                }
            }
            scan.await?;
            Ok(())
        }
        Commands::Players => {
            let store = PlayerStore::new(config.data_dir());
            for player in store.list_players().await? {
                println!("{}\t{}", player.id, player.name);
            }
            Ok(())
        }
    }
}

fn build_calculator(config: &Config) -> anyhow::Result<ProbabilityCalculator> {
    let store = PlayerStore::new(config.data_dir());
    let client = StatsClient::new(&config.stats_api)?;
    let collector = DataCollector::new(client, store.clone(), &config.stats_api);
    let source = Arc::new(StoreBackedSource::new(store, collector));
    Ok(ProbabilityCalculator::new(source, &config.analysis))
}
