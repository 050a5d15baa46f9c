use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;
use crate::universe::AssetClass;

/// OHLCV bar data. Volume is 0 for forex and commodity pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// News article as returned by a news provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: Option<String>,
    pub url: Option<String>,
    /// Provider relevance in [0, 1]; `None` when the provider does not report one.
    pub relevance: Option<f64>,
}

/// Timeframe a signal row is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        }
    }

    pub fn to_minutes(&self) -> i64 {
        match self {
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "H1" | "1H" | "60MIN" => Ok(Timeframe::H1),
            "H4" | "4H" => Ok(Timeframe::H4),
            "D1" | "1D" | "DAILY" => Ok(Timeframe::D1),
            other => Err(AnalysisError::ConfigError(format!("unknown timeframe '{}'", other))),
        }
    }
}

/// RSI zone: oversold below 30, overbought above 70
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    pub fn from_rsi(rsi: Option<f64>) -> Self {
        match rsi {
            Some(v) if v < 30.0 => RsiZone::Oversold,
            Some(v) if v > 70.0 => RsiZone::Overbought,
            _ => RsiZone::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RsiZone::Oversold => "oversold",
            RsiZone::Neutral => "neutral",
            RsiZone::Overbought => "overbought",
        }
    }
}

impl FromStr for RsiZone {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oversold" => Ok(RsiZone::Oversold),
            "neutral" => Ok(RsiZone::Neutral),
            "overbought" => Ok(RsiZone::Overbought),
            other => Err(AnalysisError::InvalidData(format!("unknown RSI zone '{}'", other))),
        }
    }
}

/// Relation of the MACD line to its signal line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MacdTrend {
    Bullish,
    Bearish,
    Neutral,
}

impl MacdTrend {
    pub fn from_lines(macd_line: f64, signal_line: f64) -> Self {
        if macd_line > signal_line {
            MacdTrend::Bullish
        } else if macd_line < signal_line {
            MacdTrend::Bearish
        } else {
            MacdTrend::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MacdTrend::Bullish => "BULLISH",
            MacdTrend::Bearish => "BEARISH",
            MacdTrend::Neutral => "NEUTRAL",
        }
    }
}

impl FromStr for MacdTrend {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BULLISH" => Ok(MacdTrend::Bullish),
            "BEARISH" => Ok(MacdTrend::Bearish),
            "NEUTRAL" => Ok(MacdTrend::Neutral),
            other => Err(AnalysisError::InvalidData(format!("unknown MACD trend '{}'", other))),
        }
    }
}

/// Latest values of every indicator. `None` means not enough history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi14: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub atr14: Option<f64>,
}

impl IndicatorSet {
    pub fn rsi_zone(&self) -> RsiZone {
        RsiZone::from_rsi(self.rsi14)
    }

    pub fn macd_trend(&self) -> Option<MacdTrend> {
        match (self.macd_line, self.macd_signal) {
            (Some(line), Some(signal)) => Some(MacdTrend::from_lines(line, signal)),
            _ => None,
        }
    }
}

/// Trade direction suggested by the level generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    None,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::None => "NONE",
        }
    }
}

impl FromStr for Direction {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LONG" => Ok(Direction::Long),
            "SHORT" => Ok(Direction::Short),
            "NONE" => Ok(Direction::None),
            other => Err(AnalysisError::InvalidData(format!("unknown direction '{}'", other))),
        }
    }
}

/// ATR-derived entry, stop and targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingLevels {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit_1: Option<f64>,
    pub take_profit_2: Option<f64>,
    pub risk_reward: Option<f64>,
}

impl TradingLevels {
    pub fn none(entry_price: f64) -> Self {
        Self {
            direction: Direction::None,
            entry_price,
            stop_loss: None,
            take_profit_1: None,
            take_profit_2: None,
            risk_reward: None,
        }
    }
}

/// Five-step signal scale shared by the technical classifier and the hybrid verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStrength {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl SignalStrength {
    /// Map a 0-100 score: >=75 strong buy, >=60 buy, <=25 strong sell, <=40 sell.
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            SignalStrength::StrongBuy
        } else if score >= 60.0 {
            SignalStrength::Buy
        } else if score <= 25.0 {
            SignalStrength::StrongSell
        } else if score <= 40.0 {
            SignalStrength::Sell
        } else {
            SignalStrength::Hold
        }
    }

    /// Fixed 0-100 score used when blending with sentiment
    pub fn to_score(&self) -> f64 {
        match self {
            SignalStrength::StrongBuy => 90.0,
            SignalStrength::Buy => 70.0,
            SignalStrength::Hold => 50.0,
            SignalStrength::Sell => 30.0,
            SignalStrength::StrongSell => 10.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStrength::StrongBuy => "STRONG_BUY",
            SignalStrength::Buy => "BUY",
            SignalStrength::Hold => "HOLD",
            SignalStrength::Sell => "SELL",
            SignalStrength::StrongSell => "STRONG_SELL",
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalStrength {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRONG_BUY" => Ok(SignalStrength::StrongBuy),
            "BUY" => Ok(SignalStrength::Buy),
            "HOLD" => Ok(SignalStrength::Hold),
            "SELL" => Ok(SignalStrength::Sell),
            "STRONG_SELL" => Ok(SignalStrength::StrongSell),
            other => Err(AnalysisError::InvalidData(format!("unknown signal '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.15 {
            SentimentLabel::Positive
        } else if score <= -0.15 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Neutral => "NEUTRAL",
            SentimentLabel::Negative => "NEGATIVE",
        }
    }
}

impl FromStr for SentimentLabel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POSITIVE" => Ok(SentimentLabel::Positive),
            "NEUTRAL" => Ok(SentimentLabel::Neutral),
            "NEGATIVE" => Ok(SentimentLabel::Negative),
            other => Err(AnalysisError::InvalidData(format!("unknown sentiment label '{}'", other))),
        }
    }
}

/// Aggregated news sentiment for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// In [-1, 1]
    pub score: f64,
    pub label: SentimentLabel,
    pub article_count: usize,
    /// In [0, 100]
    pub confidence: f64,
}

impl SentimentResult {
    /// No articles: neutral, zero confidence.
    pub fn empty() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
            article_count: 0,
            confidence: 0.0,
        }
    }

    pub fn has_articles(&self) -> bool {
        self.article_count > 0
    }
}

impl Default for SentimentResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// Output of the technical half of the pipeline for one bar series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReport {
    pub current_price: Option<f64>,
    pub price_change_pct: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub indicators: IndicatorSet,
    pub rsi_zone: RsiZone,
    pub macd_trend: Option<MacdTrend>,
    pub signal: SignalStrength,
    pub confidence: f64,
    pub levels: Option<TradingLevels>,
}

/// Persisted unit, one per (symbol, timeframe)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub asset_class: AssetClass,
    pub technical: TechnicalReport,
    pub sentiment: SentimentResult,
    pub hybrid_score: f64,
    pub verdict: SignalStrength,
    pub confidence: f64,
    pub summary: String,
    pub last_updated_at: DateTime<Utc>,
}
