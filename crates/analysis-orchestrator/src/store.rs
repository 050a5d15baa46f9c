use analysis_core::{
    AnalysisError, Direction, IndicatorSet, SentimentResult, SignalRow, SignalStore, TechnicalReport, Timeframe,
    TradingLevels,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;

fn store_err(e: sqlx::Error) -> AnalysisError {
    AnalysisError::StoreError(e.to_string())
}

/// Signal rows in SQLite, one per (symbol, timeframe).
#[derive(Clone)]
pub struct SqliteSignalStore {
    pool: SqlitePool,
}

impl SqliteSignalStore {
    /// Open (or create) the database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, AnalysisError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(store_err)?
            .create_if_missing(true);

        // Every connection to sqlite::memory: gets its own database
        let in_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        let store = Self { pool };
        store.init_schema().await?;

        tracing::info!("Signal store ready at {}", database_url);
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), AnalysisError> {
        let schema = include_str!("../schema.sql");

        // sqlx executes one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await.map_err(store_err)?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT symbol, timeframe, asset_class,
           current_price, price_change_pct, high_24h, low_24h, volume_24h,
           rsi_14, rsi_zone, sma_20, sma_50, macd_line, macd_signal, macd_histogram, macd_trend, atr_14,
           technical_signal, technical_confidence,
           direction, entry_price, stop_loss, take_profit_1, take_profit_2, risk_reward,
           sentiment_score, sentiment_label, news_count, sentiment_confidence,
           hybrid_score, verdict, confidence, summary, last_updated_at
    FROM signals
"#;

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn upsert(&self, row: &SignalRow) -> Result<(), AnalysisError> {
        let tech = &row.technical;
        let ind = &tech.indicators;
        let levels = tech.levels.as_ref();

        sqlx::query(
            r#"
            INSERT INTO signals (
                symbol, timeframe, asset_class,
                current_price, price_change_pct, high_24h, low_24h, volume_24h,
                rsi_14, rsi_zone, sma_20, sma_50, macd_line, macd_signal, macd_histogram, macd_trend, atr_14,
                technical_signal, technical_confidence,
                direction, entry_price, stop_loss, take_profit_1, take_profit_2, risk_reward,
                sentiment_score, sentiment_label, news_count, sentiment_confidence,
                hybrid_score, verdict, confidence, summary, last_updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(symbol, timeframe) DO UPDATE SET
                asset_class = excluded.asset_class,
                current_price = excluded.current_price,
                price_change_pct = excluded.price_change_pct,
                high_24h = excluded.high_24h,
                low_24h = excluded.low_24h,
                volume_24h = excluded.volume_24h,
                rsi_14 = excluded.rsi_14,
                rsi_zone = excluded.rsi_zone,
                sma_20 = excluded.sma_20,
                sma_50 = excluded.sma_50,
                macd_line = excluded.macd_line,
                macd_signal = excluded.macd_signal,
                macd_histogram = excluded.macd_histogram,
                macd_trend = excluded.macd_trend,
                atr_14 = excluded.atr_14,
                technical_signal = excluded.technical_signal,
                technical_confidence = excluded.technical_confidence,
                direction = excluded.direction,
                entry_price = excluded.entry_price,
                stop_loss = excluded.stop_loss,
                take_profit_1 = excluded.take_profit_1,
                take_profit_2 = excluded.take_profit_2,
                risk_reward = excluded.risk_reward,
                sentiment_score = excluded.sentiment_score,
                sentiment_label = excluded.sentiment_label,
                news_count = excluded.news_count,
                sentiment_confidence = excluded.sentiment_confidence,
                hybrid_score = excluded.hybrid_score,
                verdict = excluded.verdict,
                confidence = excluded.confidence,
                summary = excluded.summary,
                last_updated_at = excluded.last_updated_at
            "#,
        )
        .bind(&row.symbol)
        .bind(row.timeframe.as_str())
        .bind(row.asset_class.as_str())
        .bind(tech.current_price)
        .bind(tech.price_change_pct)
        .bind(tech.high_24h)
        .bind(tech.low_24h)
        .bind(tech.volume_24h)
        .bind(ind.rsi14)
        .bind(tech.rsi_zone.as_str())
        .bind(ind.sma20)
        .bind(ind.sma50)
        .bind(ind.macd_line)
        .bind(ind.macd_signal)
        .bind(ind.macd_histogram)
        .bind(tech.macd_trend.map(|t| t.as_str()))
        .bind(ind.atr14)
        .bind(tech.signal.as_str())
        .bind(tech.confidence)
        .bind(levels.map(|l| l.direction.as_str()))
        .bind(levels.map(|l| l.entry_price))
        .bind(levels.and_then(|l| l.stop_loss))
        .bind(levels.and_then(|l| l.take_profit_1))
        .bind(levels.and_then(|l| l.take_profit_2))
        .bind(levels.and_then(|l| l.risk_reward))
        .bind(row.sentiment.score)
        .bind(row.sentiment.label.as_str())
        .bind(row.sentiment.article_count as i64)
        .bind(row.sentiment.confidence)
        .bind(row.hybrid_score)
        .bind(row.verdict.as_str())
        .bind(row.confidence)
        .bind(&row.summary)
        .bind(row.last_updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        tracing::debug!("Upserted {} {}", row.symbol, row.timeframe);
        Ok(())
    }

    async fn get(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<SignalRow>, AnalysisError> {
        let record: Option<SignalRecord> = sqlx::query_as(&format!(
            "{} WHERE symbol = ? AND timeframe = ?",
            SELECT_COLUMNS
        ))
        .bind(symbol)
        .bind(timeframe.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        record.map(SignalRow::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<SignalRow>, AnalysisError> {
        let records: Vec<SignalRecord> = sqlx::query_as(&format!("{} ORDER BY symbol, timeframe", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        records.into_iter().map(SignalRow::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct SignalRecord {
    symbol: String,
    timeframe: String,
    asset_class: String,
    current_price: Option<f64>,
    price_change_pct: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    volume_24h: Option<f64>,
    rsi_14: Option<f64>,
    rsi_zone: String,
    sma_20: Option<f64>,
    sma_50: Option<f64>,
    macd_line: Option<f64>,
    macd_signal: Option<f64>,
    macd_histogram: Option<f64>,
    macd_trend: Option<String>,
    atr_14: Option<f64>,
    technical_signal: String,
    technical_confidence: f64,
    direction: Option<String>,
    entry_price: Option<f64>,
    stop_loss: Option<f64>,
    take_profit_1: Option<f64>,
    take_profit_2: Option<f64>,
    risk_reward: Option<f64>,
    sentiment_score: f64,
    sentiment_label: String,
    news_count: i64,
    sentiment_confidence: f64,
    hybrid_score: f64,
    verdict: String,
    confidence: f64,
    summary: String,
    last_updated_at: String,
}

impl TryFrom<SignalRecord> for SignalRow {
    type Error = AnalysisError;

    fn try_from(r: SignalRecord) -> Result<Self, Self::Error> {
        let levels = match r.direction.as_deref() {
            Some(direction) => Some(TradingLevels {
                direction: Direction::from_str(direction)?,
                entry_price: r.entry_price.or(r.current_price).unwrap_or_default(),
                stop_loss: r.stop_loss,
                take_profit_1: r.take_profit_1,
                take_profit_2: r.take_profit_2,
                risk_reward: r.risk_reward,
            }),
            None => None,
        };

        let last_updated_at = DateTime::parse_from_rfc3339(&r.last_updated_at)
            .map_err(|e| AnalysisError::InvalidData(format!("bad last_updated_at '{}': {}", r.last_updated_at, e)))?
            .with_timezone(&Utc);

        Ok(SignalRow {
            timeframe: r.timeframe.parse()?,
            asset_class: r.asset_class.parse()?,
            technical: TechnicalReport {
                current_price: r.current_price,
                price_change_pct: r.price_change_pct,
                high_24h: r.high_24h,
                low_24h: r.low_24h,
                volume_24h: r.volume_24h,
                indicators: IndicatorSet {
                    rsi14: r.rsi_14,
                    sma20: r.sma_20,
                    sma50: r.sma_50,
                    macd_line: r.macd_line,
                    macd_signal: r.macd_signal,
                    macd_histogram: r.macd_histogram,
                    atr14: r.atr_14,
                },
                rsi_zone: r.rsi_zone.parse()?,
                macd_trend: r.macd_trend.as_deref().map(str::parse).transpose()?,
                signal: r.technical_signal.parse()?,
                confidence: r.technical_confidence,
                levels,
            },
            sentiment: SentimentResult {
                score: r.sentiment_score,
                label: r.sentiment_label.parse()?,
                article_count: r.news_count.max(0) as usize,
                confidence: r.sentiment_confidence,
            },
            hybrid_score: r.hybrid_score,
            verdict: r.verdict.parse()?,
            confidence: r.confidence,
            summary: r.summary,
            last_updated_at,
            symbol: r.symbol,
        })
    }
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemorySignalStore {
    rows: DashMap<(String, Timeframe), SignalRow>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn upsert(&self, row: &SignalRow) -> Result<(), AnalysisError> {
        self.rows.insert((row.symbol.clone(), row.timeframe), row.clone());
        Ok(())
    }

    async fn get(&self, symbol: &str, timeframe: Timeframe) -> Result<Option<SignalRow>, AnalysisError> {
        Ok(self
            .rows
            .get(&(symbol.to_string(), timeframe))
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<SignalRow>, AnalysisError> {
        let mut rows: Vec<SignalRow> = self.rows.iter().map(|entry| entry.value().clone()).collect();
        rows.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| a.timeframe.as_str().cmp(b.timeframe.as_str()))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{AssetClass, MacdTrend, RsiZone, SentimentLabel, SignalStrength};
    use chrono::TimeZone;

    fn sample_row(symbol: &str, timeframe: Timeframe, verdict: SignalStrength) -> SignalRow {
        SignalRow {
            symbol: symbol.to_string(),
            timeframe,
            asset_class: AssetClass::Commodity,
            technical: TechnicalReport {
                current_price: Some(2030.0),
                price_change_pct: Some(0.4512),
                high_24h: Some(2041.2),
                low_24h: Some(2012.75),
                volume_24h: Some(0.0),
                indicators: IndicatorSet {
                    rsi14: Some(28.5),
                    sma20: Some(2044.1),
                    sma50: Some(2050.3),
                    macd_line: Some(-3.2),
                    macd_signal: Some(-2.9),
                    macd_histogram: Some(-0.3),
                    atr14: Some(15.5),
                },
                rsi_zone: RsiZone::Oversold,
                macd_trend: Some(MacdTrend::Bearish),
                signal: SignalStrength::Hold,
                confidence: 75.0,
                levels: Some(TradingLevels {
                    direction: Direction::Long,
                    entry_price: 2030.0,
                    stop_loss: Some(1999.0),
                    take_profit_1: Some(2053.25),
                    take_profit_2: Some(2076.5),
                    risk_reward: Some(1.5),
                }),
            },
            sentiment: SentimentResult {
                score: 0.32,
                label: SentimentLabel::Positive,
                article_count: 8,
                confidence: 70.0,
            },
            hybrid_score: 56.8,
            verdict,
            confidence: 73.0,
            summary: "XAUUSD trading at 2,030.00.".to_string(),
            last_updated_at: Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_upsert_and_get() {
        let store = SqliteSignalStore::connect("sqlite::memory:").await.unwrap();
        let row = sample_row("XAUUSD", Timeframe::H1, SignalStrength::Hold);

        store.upsert(&row).await.unwrap();
        let loaded = store.get("XAUUSD", Timeframe::H1).await.unwrap();
        assert_eq!(loaded, Some(row));
        assert!(store.get("XAUUSD", Timeframe::D1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_upsert_replaces_row() {
        let store = SqliteSignalStore::connect("sqlite::memory:").await.unwrap();
        store.upsert(&sample_row("XAUUSD", Timeframe::H1, SignalStrength::Hold)).await.unwrap();

        let mut updated = sample_row("XAUUSD", Timeframe::H1, SignalStrength::Buy);
        updated.technical.levels = Some(TradingLevels::none(2031.5));
        updated.technical.macd_trend = None;
        updated.sentiment = SentimentResult::empty();
        store.upsert(&updated).await.unwrap();

        let rows = store.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], updated);
    }

    #[tokio::test]
    async fn test_sqlite_keys_on_symbol_and_timeframe() {
        let store = SqliteSignalStore::connect("sqlite::memory:").await.unwrap();
        store.upsert(&sample_row("XAUUSD", Timeframe::H1, SignalStrength::Hold)).await.unwrap();
        store.upsert(&sample_row("XAUUSD", Timeframe::H4, SignalStrength::Sell)).await.unwrap();
        store.upsert(&sample_row("EURUSD", Timeframe::H1, SignalStrength::Buy)).await.unwrap();

        let rows = store.list().await.unwrap();
        let keys: Vec<(String, Timeframe)> = rows.iter().map(|r| (r.symbol.clone(), r.timeframe)).collect();
        assert_eq!(
            keys,
            vec![
                ("EURUSD".to_string(), Timeframe::H1),
                ("XAUUSD".to_string(), Timeframe::H1),
                ("XAUUSD".to_string(), Timeframe::H4),
            ]
        );
    }

    #[tokio::test]
    async fn test_sqlite_row_without_levels() {
        let store = SqliteSignalStore::connect("sqlite::memory:").await.unwrap();
        let mut row = sample_row("AAPL", Timeframe::D1, SignalStrength::Hold);
        row.asset_class = AssetClass::Stock;
        row.technical.levels = None;
        row.technical.current_price = None;
        store.upsert(&row).await.unwrap();

        assert_eq!(store.get("AAPL", Timeframe::D1).await.unwrap(), Some(row));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySignalStore::new();
        assert!(store.is_empty());

        store.upsert(&sample_row("TSLA", Timeframe::H1, SignalStrength::Hold)).await.unwrap();
        store.upsert(&sample_row("TSLA", Timeframe::H1, SignalStrength::StrongBuy)).await.unwrap();
        store.upsert(&sample_row("NVDA", Timeframe::H1, SignalStrength::Sell)).await.unwrap();

        assert_eq!(store.len(), 2);
        let tsla = store.get("TSLA", Timeframe::H1).await.unwrap().unwrap();
        assert_eq!(tsla.verdict, SignalStrength::StrongBuy);
        let symbols: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, vec!["NVDA", "TSLA"]);
    }
}
