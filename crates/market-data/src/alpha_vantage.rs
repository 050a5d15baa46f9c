use analysis_core::{find_asset, AnalysisError, Asset, Bar, PriceProvider, Timeframe};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use technical_analysis::{aggregate_bars, normalize_bars};

use crate::rate_limit::RateLimiter;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Free tier allows 5 requests per minute
pub const DEFAULT_REQUESTS_PER_MINUTE: usize = 5;

const INTRADAY_INTERVAL: &str = "60min";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeriesKind {
    Intraday,
    Daily,
}

#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl AlphaVantageClient {
    pub fn new(api_key: String, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
            rate_limiter: RateLimiter::per_minute(requests_per_minute),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a query with rate limiting and automatic 429 retry.
    async fn send_request(&self, params: &[(&str, String)]) -> Result<Value, AnalysisError> {
        let request = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", &self.api_key)])
            .build()
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status().as_u16() == 429 {
                let wait_secs = 15u64;
                tracing::warn!("AlphaVantage 429 rate limited, waiting {}s before retry {}/3", wait_secs, attempt + 1);
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            if !response.status().is_success() {
                return Err(AnalysisError::ApiError(format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                )));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
            check_api_message(&body)?;
            return Ok(body);
        }

        Err(AnalysisError::ApiError("Rate limited by AlphaVantage after 3 retries".to_string()))
    }

    async fn fetch_series(&self, asset: &Asset, kind: SeriesKind, full: bool) -> Result<Vec<Bar>, AnalysisError> {
        let outputsize = if full { "full" } else { "compact" }.to_string();
        let mut params: Vec<(&str, String)> = Vec::new();

        let key = match (asset.fx_pair(), kind) {
            (Some((from, to)), SeriesKind::Intraday) => {
                params.push(("function", "FX_INTRADAY".to_string()));
                params.push(("from_symbol", from.to_string()));
                params.push(("to_symbol", to.to_string()));
                params.push(("interval", INTRADAY_INTERVAL.to_string()));
                "Time Series FX (Intraday)".to_string()
            }
            (Some((from, to)), SeriesKind::Daily) => {
                params.push(("function", "FX_DAILY".to_string()));
                params.push(("from_symbol", from.to_string()));
                params.push(("to_symbol", to.to_string()));
                "Time Series FX (Daily)".to_string()
            }
            (None, SeriesKind::Intraday) => {
                params.push(("function", "TIME_SERIES_INTRADAY".to_string()));
                params.push(("symbol", asset.symbol.to_string()));
                params.push(("interval", INTRADAY_INTERVAL.to_string()));
                format!("Time Series ({})", INTRADAY_INTERVAL)
            }
            (None, SeriesKind::Daily) => {
                params.push(("function", "TIME_SERIES_DAILY".to_string()));
                params.push(("symbol", asset.symbol.to_string()));
                "Time Series (Daily)".to_string()
            }
        };
        params.push(("outputsize", outputsize));

        tracing::info!("Fetching {:?} series for {}", kind, asset.symbol);
        let body = self.send_request(&params).await?;
        parse_series(&body, &key)
    }

    /// Intraday series, falling back to daily when intraday is unavailable.
    async fn fetch_with_fallback(&self, asset: &Asset, full: bool) -> Result<(Vec<Bar>, SeriesKind), AnalysisError> {
        match self.fetch_series(asset, SeriesKind::Intraday, full).await {
            Ok(bars) if !bars.is_empty() => Ok((bars, SeriesKind::Intraday)),
            Ok(_) => {
                tracing::warn!("{}: empty intraday series, falling back to daily", asset.symbol);
                Ok((self.fetch_series(asset, SeriesKind::Daily, false).await?, SeriesKind::Daily))
            }
            Err(e) => {
                tracing::warn!("{}: intraday fetch failed ({}), falling back to daily", asset.symbol, e);
                Ok((self.fetch_series(asset, SeriesKind::Daily, false).await?, SeriesKind::Daily))
            }
        }
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageClient {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let asset = find_asset(symbol)
            .ok_or_else(|| AnalysisError::InvalidData(format!("unknown symbol '{}'", symbol)))?;

        let bars = match timeframe {
            Timeframe::H1 => self.fetch_with_fallback(asset, false).await?.0,
            Timeframe::H4 => match self.fetch_with_fallback(asset, true).await? {
                (hourly, SeriesKind::Intraday) => aggregate_bars(&hourly, Timeframe::H4.to_minutes()),
                (daily, SeriesKind::Daily) => daily,
            },
            Timeframe::D1 => self.fetch_series(asset, SeriesKind::Daily, false).await?,
        };

        let mut bars = normalize_bars(bars);
        if bars.len() > lookback {
            bars.drain(..bars.len() - lookback);
        }
        Ok(bars)
    }
}

/// Error, rate-limit and informational payloads come back with HTTP 200.
fn check_api_message(body: &Value) -> Result<(), AnalysisError> {
    for key in ["Error Message", "Note", "Information"] {
        if let Some(msg) = body.get(key).and_then(Value::as_str) {
            return Err(AnalysisError::ApiError(format!("AlphaVantage {}: {}", key, msg)));
        }
    }
    Ok(())
}

/// Parse a `"Time Series ..."` object into ascending bars. FX series have no volume.
pub fn parse_series(body: &Value, key: &str) -> Result<Vec<Bar>, AnalysisError> {
    let series = body
        .get(key)
        .and_then(Value::as_object)
        .ok_or_else(|| AnalysisError::InsufficientData(format!("response has no '{}'", key)))?;

    let mut bars = Vec::with_capacity(series.len());
    for (stamp, fields) in series {
        let timestamp = parse_timestamp(stamp)
            .ok_or_else(|| AnalysisError::InvalidData(format!("bad timestamp '{}'", stamp)))?;
        let field = |name: &str| -> Result<f64, AnalysisError> {
            fields
                .get(name)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| AnalysisError::InvalidData(format!("missing '{}' at {}", name, stamp)))
        };

        bars.push(Bar {
            timestamp,
            open: field("1. open")?,
            high: field("2. high")?,
            low: field("3. low")?,
            close: field("4. close")?,
            volume: field("5. volume").unwrap_or(0.0),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

fn parse_timestamp(stamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(stamp, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_stock_intraday() {
        let body = json!({
            "Meta Data": { "1. Information": "Intraday (60min)" },
            "Time Series (60min)": {
                "2024-06-03 16:00:00": {
                    "1. open": "194.10", "2. high": "194.50", "3. low": "193.90",
                    "4. close": "194.03", "5. volume": "1200345"
                },
                "2024-06-03 15:00:00": {
                    "1. open": "193.50", "2. high": "194.20", "3. low": "193.40",
                    "4. close": "194.10", "5. volume": "980000"
                }
            }
        });

        let bars = parse_series(&body, "Time Series (60min)").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap());
        assert_eq!(bars[1].close, 194.03);
        assert_eq!(bars[1].volume, 1200345.0);
    }

    #[test]
    fn test_parse_fx_daily_without_volume() {
        let body = json!({
            "Time Series FX (Daily)": {
                "2024-06-03": { "1. open": "1.0850", "2. high": "1.0890", "3. low": "1.0832", "4. close": "1.0871" }
            }
        });

        let bars = parse_series(&body, "Time Series FX (Daily)").unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp, Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap());
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn test_missing_series_key() {
        let body = json!({ "Meta Data": {} });
        assert!(matches!(
            parse_series(&body, "Time Series (Daily)"),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_malformed_value() {
        let body = json!({
            "Time Series (Daily)": {
                "2024-06-03": { "1. open": "abc", "2. high": "1", "3. low": "1", "4. close": "1" }
            }
        });
        assert!(matches!(parse_series(&body, "Time Series (Daily)"), Err(AnalysisError::InvalidData(_))));
    }

    #[test]
    fn test_api_messages_are_errors() {
        assert!(check_api_message(&json!({ "Note": "Thank you for using Alpha Vantage!" })).is_err());
        assert!(check_api_message(&json!({ "Error Message": "Invalid API call." })).is_err());
        assert!(check_api_message(&json!({ "Information": "Premium endpoint." })).is_err());
        assert!(check_api_message(&json!({ "Time Series (Daily)": {} })).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_symbol_rejected() {
        let client = AlphaVantageClient::new("demo".to_string(), DEFAULT_REQUESTS_PER_MINUTE)
            .with_base_url("http://127.0.0.1:9");
        let err = client.get_bars("DOGEUSD", Timeframe::H1, 100).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidData(_)));
    }
}
