//! paper-sim: paper-trades a market maker against live or recorded trades.
//!
//! Usage:
//!   paper-sim [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>           Config file path (default: config/paper.toml)
//!   --markets <MARKETS>           Comma-separated markets to trade (overrides config)
//!   --replay <FILE>               Replay a recorded session instead of streaming (repeatable)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use paper_maker::config::AppConfig;
use paper_maker::engine::{PaperEngine, SessionSummary};
use paper_maker::events::TracingReporter;
use paper_maker::feed::{LiveFeed, ReplayFeed, ReplayFile};
use paper_maker::types::MarketId;

/// CLI arguments for paper-sim.
#[derive(Parser, Debug)]
#[command(name = "paper-sim")]
#[command(about = "Paper-trading market maker simulation")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/paper.toml")]
    config: PathBuf,

    /// Comma-separated markets to trade (e.g., "XBTUSDC,ETHUSDC")
    #[arg(long, value_delimiter = ',')]
    markets: Option<Vec<String>>,

    /// API key id (overrides config and environment)
    #[arg(long)]
    api_key_id: Option<String>,

    /// Path to the file holding the API secret
    #[arg(long)]
    api_secret_path: Option<PathBuf>,

    /// Recorded session to replay; no network access in this mode
    #[arg(long)]
    replay: Vec<PathBuf>,

    /// Stop every market as soon as one fails
    #[arg(long)]
    cancel_on_error: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(markets) = &self.markets {
            config.subscribe = markets.iter().map(|m| MarketId::new(m.as_str())).collect();
        }
        if let Some(key) = &self.api_key_id {
            config.api_key_id = Some(key.clone());
        }
        if let Some(path) = &self.api_secret_path {
            config.api_secret_path = path.clone();
        }
        if self.cancel_on_error {
            config.cancel_on_error = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("paper-sim: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config_missing = !args.config.exists();
    let mut config = if config_missing {
        AppConfig::default()
    } else {
        AppConfig::from_file(&args.config)
            .with_context(|| format!("loading config from {:?}", args.config))?
    };
    config.apply_env_overrides();
    args.apply(&mut config);

    init_logging(&config.log_level)?;
    if config_missing {
        warn!("Config file not found at {:?}, using defaults", args.config);
    }

    let engine = if args.replay.is_empty() {
        live_engine(&config)?
    } else {
        replay_engine(&mut config, &args.replay)?
    };

    let markets: Vec<_> = engine.markets().collect();
    info!(
        ?markets,
        cancel_on_error = config.cancel_on_error,
        "Starting paper-sim"
    );

    let summaries = engine.run(TracingReporter).await?;
    for summary in &summaries {
        log_summary(summary);
    }
    Ok(())
}

// RUST_LOG wins over the configured level
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {}", e))
}

fn live_engine(config: &AppConfig) -> Result<PaperEngine> {
    config.validate().context("invalid configuration")?;
    let live = config
        .live_feed_config()
        .with_context(|| format!("reading credentials from {:?}", config.api_secret_path))?;

    let mut engine = PaperEngine::new(config.engine_config());
    for market in &config.subscribe {
        engine.add_market(market.clone(), LiveFeed::new(market.clone(), live.clone()))?;
    }
    Ok(engine)
}

fn replay_engine(config: &mut AppConfig, paths: &[PathBuf]) -> Result<PaperEngine> {
    let files = paths
        .iter()
        .map(|path| {
            ReplayFile::from_path(path).with_context(|| format!("loading replay {:?}", path))
        })
        .collect::<Result<Vec<_>>>()?;

    // the recordings decide which markets run
    config.subscribe = files.iter().map(|f| f.market.clone()).collect();
    config.validate().context("invalid configuration")?;

    let mut engine = PaperEngine::new(config.engine_config());
    for file in files {
        let market = file.market.clone();
        engine.add_market(market, ReplayFeed::from_file(file))?;
    }
    Ok(engine)
}

fn log_summary(summary: &SessionSummary) {
    let realized_return = summary.stats.performance().map(|p| p.realized_return);
    info!(
        market = %summary.market,
        batches = summary.batches_processed,
        fills = summary.stats.fills,
        base = %summary.wallet.base,
        counter = %summary.wallet.counter,
        total_bought = %summary.stats.total_bought,
        total_sold = %summary.stats.total_sold,
        ?realized_return,
        "Session summary"
    );
}
