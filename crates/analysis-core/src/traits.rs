use async_trait::async_trait;
use crate::{AnalysisError, Bar, NewsArticle, SignalRow, Timeframe};

/// Source of OHLCV history
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Ascending bars for `symbol`, at most `lookback` of the most recent ones.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, AnalysisError>;
}

/// Source of recent news for a symbol
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn get_articles(&self, symbol: &str, since_days: u32) -> Result<Vec<NewsArticle>, AnalysisError>;
}

/// Durable signal storage, at most one row per (symbol, timeframe)
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn upsert(&self, row: &SignalRow) -> Result<(), AnalysisError>;

    async fn get(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<SignalRow>, AnalysisError>;

    async fn list(&self) -> Result<Vec<SignalRow>, AnalysisError>;
}
