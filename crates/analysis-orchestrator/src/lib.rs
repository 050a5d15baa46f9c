use analysis_core::{
    AnalysisError, Asset, NewsProvider, PriceProvider, SentimentResult, SignalRow, SignalStore, Timeframe,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sentiment_analysis::SentimentAnalysisEngine;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use technical_analysis::TechnicalAnalysisEngine;
use tokio::time::{self, MissedTickBehavior};

pub mod hybrid;
pub mod store;
pub mod summary;

pub use hybrid::{combine, sentiment_to_score, HybridResult};
pub use store::{MemorySignalStore, SqliteSignalStore};
pub use summary::generate_summary;

/// Confidence given to sentiment reused from a stored row
pub const CACHED_SENTIMENT_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Bars requested per symbol
    pub lookback: usize,
    /// How far back the news provider searches
    pub news_lookback_days: u32,
    /// Stored sentiment younger than this is reused instead of fetching news
    pub news_cache_hours: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lookback: 200,
            news_lookback_days: 3,
            news_cache_hours: 24,
        }
    }
}

/// Outcome of one pass over the symbol list
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub processed: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Symbols never reached because the store failed
    pub skipped: Vec<String>,
    pub aborted: Option<String>,
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_none()
    }
}

/// Hybrid signal pipeline: price provider, technical engine, news sentiment,
/// blend, store. Symbols are processed one at a time.
pub struct SignalEngine {
    prices: Arc<dyn PriceProvider>,
    news: Option<Arc<dyn NewsProvider>>,
    store: Arc<dyn SignalStore>,
    technical_analyzer: TechnicalAnalysisEngine,
    sentiment_analyzer: SentimentAnalysisEngine,
    settings: EngineSettings,
}

impl SignalEngine {
    pub fn new(
        prices: Arc<dyn PriceProvider>,
        news: Option<Arc<dyn NewsProvider>>,
        store: Arc<dyn SignalStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            prices,
            news,
            store,
            technical_analyzer: TechnicalAnalysisEngine::new(),
            sentiment_analyzer: SentimentAnalysisEngine::new(),
            settings,
        }
    }

    pub fn with_technical_engine(mut self, engine: TechnicalAnalysisEngine) -> Self {
        self.technical_analyzer = engine;
        self
    }

    pub fn with_sentiment_engine(mut self, engine: SentimentAnalysisEngine) -> Self {
        self.sentiment_analyzer = engine;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn SignalStore> {
        &self.store
    }

    /// Build the signal row for one asset without persisting it.
    pub async fn analyze_symbol(
        &self,
        asset: &Asset,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<SignalRow, AnalysisError> {
        tracing::info!("Analyzing {} ({})", asset.symbol, timeframe);

        let bars = self
            .prices
            .get_bars(asset.symbol, timeframe, self.settings.lookback)
            .await?;
        tracing::debug!("{}: {} bars", asset.symbol, bars.len());

        let technical = self.technical_analyzer.analyze(asset.symbol, &bars);
        let sentiment = self.resolve_sentiment(asset, timeframe, now).await?;
        let hybrid = combine(technical.signal, technical.confidence, &sentiment);
        let summary = generate_summary(asset.symbol, &technical, &sentiment, hybrid.verdict);

        tracing::info!(
            "{} {}: {} (score {:.1}, confidence {:.0}%, {} articles)",
            asset.symbol,
            timeframe,
            hybrid.verdict,
            hybrid.score,
            hybrid.confidence,
            sentiment.article_count
        );

        Ok(SignalRow {
            symbol: asset.symbol.to_string(),
            timeframe,
            asset_class: asset.class,
            technical,
            sentiment,
            hybrid_score: hybrid.score,
            verdict: hybrid.verdict,
            confidence: hybrid.confidence,
            summary,
            last_updated_at: now,
        })
    }

    /// Sentiment for a priority asset: fresh stored value, else the news
    /// provider. News failures degrade to no sentiment.
    async fn resolve_sentiment(
        &self,
        asset: &Asset,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> Result<SentimentResult, AnalysisError> {
        let Some(news) = self.news.as_ref().filter(|_| asset.priority_sentiment) else {
            return Ok(SentimentResult::empty());
        };

        // An unreadable stored row is a cache miss; the upsert replaces it
        match self.store.get(asset.symbol, timeframe).await {
            Ok(Some(previous)) => {
                if let Some(cached) = cached_sentiment(&previous, now, self.settings.news_cache_hours) {
                    tracing::debug!(
                        "{}: reusing sentiment from {} ({} articles)",
                        asset.symbol,
                        previous.last_updated_at,
                        cached.article_count
                    );
                    return Ok(cached);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("{}: stored signal unreadable, fetching news: {}", asset.symbol, e);
            }
        }

        match news.get_articles(asset.symbol, self.settings.news_lookback_days).await {
            Ok(articles) => Ok(self.sentiment_analyzer.analyze(asset.symbol, &articles, now)),
            Err(e) => {
                tracing::warn!("{}: news unavailable, technical only: {}", asset.symbol, e);
                Ok(SentimentResult::empty())
            }
        }
    }

    /// Analyze every asset and upsert its row. Provider failures skip the
    /// symbol; a store failure ends the cycle.
    pub async fn run_cycle(&self, assets: &[&Asset], timeframe: Timeframe) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();
        tracing::info!("Starting {} cycle over {} symbols", timeframe, assets.len());

        for (i, asset) in assets.iter().enumerate() {
            let outcome = match self.analyze_symbol(asset, timeframe, Utc::now()).await {
                Ok(row) => self.store.upsert(&row).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.processed.push(asset.symbol.to_string()),
                Err(e) if e.is_provider_error() => {
                    tracing::warn!("{}: skipped this cycle: {}", asset.symbol, e);
                    report.failed.push((asset.symbol.to_string(), e.to_string()));
                }
                Err(e) => {
                    tracing::error!("{}: aborting cycle: {}", asset.symbol, e);
                    report.aborted = Some(e.to_string());
                    report.skipped = assets[i..].iter().map(|a| a.symbol.to_string()).collect();
                    break;
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "{} cycle done in {:.1}s: {} updated, {} failed, {} skipped",
            timeframe,
            report.duration_ms as f64 / 1000.0,
            report.processed.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }

    /// Run a cycle immediately and then every `every`, until `shutdown`
    /// resolves. An in-flight cycle always completes. Returns the cycle count.
    pub async fn run_scheduled<F>(
        &self,
        assets: &[&Asset],
        timeframe: Timeframe,
        every: Duration,
        shutdown: F,
    ) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested after {} cycles", cycles);
                    break;
                }
                _ = interval.tick() => {
                    self.run_cycle(assets, timeframe).await;
                    cycles += 1;
                    tracing::info!("Next {} cycle in {} minutes", timeframe, every.as_secs() / 60);
                }
            }
        }
        cycles
    }
}

/// Stored sentiment if it came from news and is younger than `max_age_hours`.
pub fn cached_sentiment(row: &SignalRow, now: DateTime<Utc>, max_age_hours: i64) -> Option<SentimentResult> {
    if !row.sentiment.has_articles() {
        return None;
    }
    if now - row.last_updated_at >= ChronoDuration::hours(max_age_hours) {
        return None;
    }
    Some(SentimentResult {
        confidence: CACHED_SENTIMENT_CONFIDENCE,
        ..row.sentiment
    })
}
