use std::sync::Arc;
use std::time::Duration;

use analysis_core::{resolve_assets, NewsProvider, SignalStore, Timeframe, UNIVERSE};
use analysis_orchestrator::{SignalEngine, SqliteSignalStore};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use market_data::{AlphaVantageClient, MarketauxClient};
use tokio::signal::unix::SignalKind;

mod config;

use config::EngineConfig;

const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Run a single cycle and exit
    Once,
    /// Run a cycle every --interval minutes until interrupted
    Schedule,
}

#[derive(Parser, Debug)]
#[command(version, about = "StockLens hybrid signal engine")]
struct Args {
    #[arg(long, value_enum, default_value = "once")]
    mode: Mode,

    /// Symbols to analyze (default: the whole universe)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    symbols: Vec<String>,

    /// H1, H4 or D1
    #[arg(long, default_value = "H1")]
    timeframe: Timeframe,

    /// Minutes between scheduled cycles (at most one week)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES))]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    let args = Args::parse();
    let config = EngineConfig::from_env()?;

    let assets = if args.symbols.is_empty() {
        UNIVERSE.iter().collect()
    } else {
        resolve_assets(&args.symbols).context("invalid --symbols")?
    };

    tracing::info!("Starting StockLens signal engine");
    tracing::info!("  Mode: {:?}, timeframe: {}", args.mode, args.timeframe);
    tracing::info!(
        "  Symbols: {}",
        assets.iter().map(|a| a.symbol).collect::<Vec<_>>().join(", ")
    );
    tracing::info!("  Price requests/min: {}", config.alphavantage_rate_limit);

    let store: Arc<dyn SignalStore> = Arc::new(
        SqliteSignalStore::connect(&config.database_url)
            .await
            .with_context(|| format!("failed to open signal store at {}", config.database_url))?,
    );

    let prices = Arc::new(AlphaVantageClient::new(
        config.alphavantage_api_key.clone(),
        config.alphavantage_rate_limit,
    ));

    let news: Option<Arc<dyn NewsProvider>> = match &config.marketaux_api_key {
        Some(key) => Some(Arc::new(MarketauxClient::new(key.clone(), config.marketaux_monthly_quota))),
        None => {
            tracing::warn!("MARKETAUX_API_KEY not set, all symbols scored technical-only");
            None
        }
    };

    let engine = SignalEngine::new(prices, news, store, config.engine_settings());

    match args.mode {
        Mode::Once => {
            let report = engine.run_cycle(&assets, args.timeframe).await;
            if let Some(reason) = report.aborted {
                anyhow::bail!("cycle aborted: {}", reason);
            }
        }
        Mode::Schedule => {
            let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
            let shutdown = async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received SIGINT");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM");
                    }
                }
            };

            let every = Duration::from_secs(args.interval * 60);
            engine.run_scheduled(&assets, args.timeframe, every, shutdown).await;
        }
    }

    tracing::info!("Signal engine stopped");
    Ok(())
}
